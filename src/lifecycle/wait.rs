//! Wait phase.
//!
//! The second call of the two-phase pattern: re-poll the provider with the id
//! the action phase stashed, and produce the same three-way outcome. For
//! creation flows a successful poll also reconciles provider-side related ids
//! against locally tracked records; a miss downgrades to a warning on an
//! otherwise successful node, because the external side effect has already
//! happened.

use crate::lifecycle::action::outcome_from_resource;
use crate::lifecycle::outcome::StepOutcome;
use crate::lifecycle::provider::{ProviderClient, RelatedResourceResolver};
use tracing::{debug, warn};

/// Poll a resource under creation and reconcile related identifiers on
/// terminal success.
pub async fn run_create_wait(
    provider: &dyn ProviderClient,
    resolver: &dyn RelatedResourceResolver,
    resource_type: &str,
    provider_id: &str,
    related_resource_type: &str,
) -> StepOutcome {
    let resource = match provider.poll_resource(resource_type, provider_id).await {
        Ok(resource) => resource,
        Err(err) => {
            warn!(resource_type, provider_id, error = %err, "wait-phase poll failed");
            return StepOutcome::failed_from(&err);
        }
    };

    let related_ids = resource.related_provider_ids.clone();
    let outcome = outcome_from_resource(resource);

    let StepOutcome::Successful { result, .. } = outcome else {
        return outcome;
    };

    // Resolve newly learned provider ids back to local records. Records that
    // are not yet tracked locally will only be corrected by a later
    // reconciliation pass; the provider-side operation itself succeeded.
    let mut unresolved = Vec::new();
    for related_id in &related_ids {
        match resolver.resolve(related_resource_type, related_id).await {
            Ok(Some(_)) => {}
            Ok(None) => unresolved.push(related_id.clone()),
            Err(err) => {
                warn!(related_id, error = %err, "related-resource lookup failed");
                unresolved.push(related_id.clone());
            }
        }
    }

    let warning = if unresolved.is_empty() {
        None
    } else {
        debug!(?unresolved, "related resources not yet tracked locally");
        Some(format!(
            "no local record for related {related_resource_type}(s) {}; \
             records will be corrected by a later reconciliation pass",
            unresolved.join(", ")
        ))
    };

    StepOutcome::Successful { result, warning }
}

/// Poll a resource under deletion.
pub async fn run_delete_wait(
    provider: &dyn ProviderClient,
    resource_type: &str,
    provider_id: &str,
) -> StepOutcome {
    match provider.poll_resource(resource_type, provider_id).await {
        Ok(resource) => outcome_from_resource(resource),
        Err(err) if err.is_not_found() => StepOutcome::Successful {
            result: serde_json::json!({
                "provider_id": provider_id,
                "already_deleted": true,
            }),
            warning: None,
        },
        Err(err) => StepOutcome::failed_from(&err),
    }
}
