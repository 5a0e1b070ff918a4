//! Action phase.
//!
//! The first of the two calls every asynchronous provider operation needs:
//! issue the mutating call, then read the provider's lifecycle indicator to
//! decide whether the node is already terminal or must wait for the poll
//! phase. Decoupling "did the call succeed" from "has the operation finished"
//! is what lets the dispatcher re-enqueue without re-issuing the mutation.

use crate::lifecycle::outcome::{FailureKind, StepOutcome};
use crate::lifecycle::provider::{classify_lifecycle, LifecyclePhase, ProviderClient, ProviderResource};
use serde_json::Value;
use tracing::{debug, warn};

/// Issue a creation call and map the result onto a step outcome.
///
/// A 409 (name collision) is surfaced verbatim as the failure message.
pub async fn run_create_action(
    provider: &dyn ProviderClient,
    resource_type: &str,
    spec: &Value,
) -> StepOutcome {
    match provider.create_resource(resource_type, spec).await {
        Ok(resource) => outcome_from_resource(resource),
        Err(err) => {
            warn!(resource_type, error = %err, "create action failed");
            StepOutcome::failed_from(&err)
        }
    }
}

/// Issue a deletion call and map the result onto a step outcome.
///
/// A 404 means the object is already gone and is treated as success, which
/// makes re-deleting a resource the provider is already tearing down safe.
pub async fn run_delete_action(
    provider: &dyn ProviderClient,
    resource_type: &str,
    provider_id: &str,
) -> StepOutcome {
    match provider.delete_resource(resource_type, provider_id).await {
        Ok(resource) => outcome_from_resource(resource),
        Err(err) if err.is_not_found() => {
            debug!(resource_type, provider_id, "resource already gone, treating delete as successful");
            StepOutcome::Successful {
                result: serde_json::json!({
                    "provider_id": provider_id,
                    "already_deleted": true,
                }),
                warning: None,
            }
        }
        Err(err) => {
            warn!(resource_type, provider_id, error = %err, "delete action failed");
            StepOutcome::failed_from(&err)
        }
    }
}

/// Issue a detachment call for one attachment relationship.
pub async fn run_detach_action(
    provider: &dyn ProviderClient,
    resource_type: &str,
    provider_id: &str,
    from_provider_id: &str,
) -> StepOutcome {
    match provider
        .detach_resource(resource_type, provider_id, from_provider_id)
        .await
    {
        Ok(resource) => outcome_from_resource(resource),
        Err(err) if err.is_not_found() => StepOutcome::Successful {
            result: serde_json::json!({
                "provider_id": provider_id,
                "already_detached": true,
            }),
            warning: None,
        },
        Err(err) => StepOutcome::failed_from(&err),
    }
}

/// Map a provider resource's lifecycle indicator onto the three-way outcome
pub fn outcome_from_resource(resource: ProviderResource) -> StepOutcome {
    match classify_lifecycle(&resource.lifecycle_state) {
        LifecyclePhase::TerminalSuccess => StepOutcome::Successful {
            result: serde_json::to_value(&resource).unwrap_or(Value::Null),
            warning: None,
        },
        LifecyclePhase::TerminalFailure => StepOutcome::Failed {
            message: format!(
                "provider reports {} for {}",
                resource.lifecycle_state, resource.provider_id
            ),
            kind: FailureKind::Execute,
        },
        LifecyclePhase::InProgress => StepOutcome::Waiting {
            provider_id: resource.provider_id,
        },
    }
}
