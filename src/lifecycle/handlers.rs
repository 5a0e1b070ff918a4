//! Provider-backed step handlers.
//!
//! One handler instance serves both phases of its binding: a node dispatched
//! with no status runs the action phase, a RUNNING_WAIT node re-entering the
//! same handler runs the wait phase against the id the action phase stashed.

use crate::constants::NodeStatus;
use crate::error::{Result, StratusError};
use crate::handlers::{StepHandler, TaskPayload};
use crate::lifecycle::action::{run_create_action, run_delete_action, run_detach_action};
use crate::lifecycle::outcome::{FailureKind, StepOutcome};
use crate::lifecycle::provider::{ProviderClient, RelatedResourceResolver};
use crate::lifecycle::retry::{run_with_retry, RetryPolicy, ShellError, ShellOutcome};
use crate::lifecycle::wait::{run_create_wait, run_delete_wait};
use crate::models::TaskNode;
use crate::store::Store;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Persist a step outcome on the node, and propagate the one out-of-node side
/// effect: an auth rejection invalidates the owning cloud account.
pub async fn commit_outcome(
    store: &dyn Store,
    mut node: TaskNode,
    outcome: StepOutcome,
) -> Result<()> {
    match outcome {
        StepOutcome::Successful { result, warning } => {
            node.mark_successful(result, warning);
        }
        StepOutcome::Waiting { provider_id } => {
            node.task_metadata.set_provider_id(provider_id);
            node.mark_waiting();
        }
        StepOutcome::Failed { message, kind } => {
            node.mark_failed(message);
            if kind == FailureKind::Auth {
                let root = store.root(node.root_id).await?;
                if let Some(account_id) = root.account_id {
                    store.mark_account_invalid(account_id).await?;
                }
            }
        }
    }
    store.update_node(&node).await
}

/// Creation flow handler: mutating call first, then polls until the provider
/// converges. On terminal success the node's `resource_id` is reconciled from
/// local records when the resolver knows the new provider id.
pub struct CreateResourceHandler {
    provider: Arc<dyn ProviderClient>,
    resolver: Arc<dyn RelatedResourceResolver>,
    /// Resource type of the related records reconciled during the wait phase
    related_resource_type: String,
}

impl CreateResourceHandler {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        resolver: Arc<dyn RelatedResourceResolver>,
        related_resource_type: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            resolver,
            related_resource_type: related_resource_type.into(),
        }
    }

    /// Local record lookup for a freshly created provider id. A lookup error
    /// is logged and treated the same as a miss: the provider-side resource
    /// exists either way, so the node still completes and a later
    /// reconciliation pass corrects the record.
    async fn resolve_local_record(&self, resource_type: &str, provider_id: &str) -> Option<Uuid> {
        match self.resolver.resolve(resource_type, provider_id).await {
            Ok(found) => found,
            Err(err) => {
                warn!(resource_type, provider_id, error = %err, "local record lookup failed");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl StepHandler for CreateResourceHandler {
    #[instrument(skip(self, store), fields(node_id = %node_id))]
    async fn handle(&self, node_id: Uuid, store: &dyn Store) -> Result<()> {
        let mut node = store.node(node_id).await?;
        if node.is_terminal() {
            debug!("node already terminal, nothing to do");
            return Ok(());
        }

        let outcome = match node.status {
            Some(NodeStatus::RunningWait) => {
                let Some(provider_id) = node.task_metadata.provider_id().map(String::from) else {
                    return commit_outcome(
                        store,
                        node,
                        StepOutcome::Failed {
                            message: "wait phase reached without a stashed provider id"
                                .to_string(),
                            kind: FailureKind::Handler,
                        },
                    )
                    .await;
                };
                run_create_wait(
                    self.provider.as_ref(),
                    self.resolver.as_ref(),
                    &node.resource_type,
                    &provider_id,
                    &self.related_resource_type,
                )
                .await
            }
            _ => match node.task_metadata.spec_value() {
                Some(spec) => {
                    run_create_action(self.provider.as_ref(), &node.resource_type, &spec).await
                }
                None => {
                    let message = format!("creation payload missing for {}", node.resource_type);
                    return commit_outcome(
                        store,
                        node,
                        StepOutcome::Failed {
                            message,
                            kind: FailureKind::InvalidRequest,
                        },
                    )
                    .await;
                }
            },
        };

        // resource_id becomes known once creation succeeded, in whichever
        // phase observed convergence
        if let StepOutcome::Successful { result, .. } = &outcome {
            let provider_id = result
                .get("provider_id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .or_else(|| node.task_metadata.provider_id().map(String::from));
            if let Some(provider_id) = provider_id {
                if let Some(local_id) = self
                    .resolve_local_record(&node.resource_type, &provider_id)
                    .await
                {
                    node.resource_id = Some(local_id);
                }
            }
        }

        commit_outcome(store, node, outcome).await
    }
}

/// Deletion flow handler. A provider 404 at either phase completes the node
/// successfully, making re-deletes idempotent.
pub struct DeleteResourceHandler {
    provider: Arc<dyn ProviderClient>,
}

impl DeleteResourceHandler {
    pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl StepHandler for DeleteResourceHandler {
    #[instrument(skip(self, store), fields(node_id = %node_id))]
    async fn handle(&self, node_id: Uuid, store: &dyn Store) -> Result<()> {
        let node = store.node(node_id).await?;
        if node.is_terminal() {
            return Ok(());
        }

        let Some(provider_id) = node.task_metadata.provider_id().map(String::from) else {
            return commit_outcome(
                store,
                node,
                StepOutcome::Failed {
                    message: "deletion payload missing a provider id".to_string(),
                    kind: FailureKind::InvalidRequest,
                },
            )
            .await;
        };

        let outcome = match node.status {
            Some(NodeStatus::RunningWait) => {
                run_delete_wait(self.provider.as_ref(), &node.resource_type, &provider_id).await
            }
            _ => {
                run_delete_action(self.provider.as_ref(), &node.resource_type, &provider_id).await
            }
        };

        commit_outcome(store, node, outcome).await
    }
}

/// Detachment handler for shared resources referenced by several parents.
/// Bound to composite `"{child}-{parent}"` resource tags.
pub struct DetachGatewayHandler {
    provider: Arc<dyn ProviderClient>,
}

impl DetachGatewayHandler {
    pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl StepHandler for DetachGatewayHandler {
    #[instrument(skip(self, store), fields(node_id = %node_id))]
    async fn handle(&self, node_id: Uuid, store: &dyn Store) -> Result<()> {
        let node = store.node(node_id).await?;
        if node.is_terminal() {
            return Ok(());
        }

        let TaskPayload::DetachGateway {
            gateway_provider_id,
            subnet_provider_id,
        } = node.task_metadata.clone()
        else {
            return commit_outcome(
                store,
                node,
                StepOutcome::Failed {
                    message: "detach payload malformed".to_string(),
                    kind: FailureKind::InvalidRequest,
                },
            )
            .await;
        };

        // composite tag: the part before '-' names the detached child kind
        let child_type = node
            .resource_type
            .split('-')
            .next()
            .unwrap_or(&node.resource_type)
            .to_string();

        let outcome = match node.status {
            Some(NodeStatus::RunningWait) => {
                run_delete_wait(self.provider.as_ref(), &child_type, &gateway_provider_id).await
            }
            _ => {
                run_detach_action(
                    self.provider.as_ref(),
                    &child_type,
                    &gateway_provider_id,
                    &subnet_provider_id,
                )
                .await
            }
        };

        commit_outcome(store, node, outcome).await
    }
}

/// Executes one remote-shell command per node under an explicit retry policy.
#[async_trait::async_trait]
pub trait ShellRunner: Send + Sync {
    async fn run(&self, command: &str) -> std::result::Result<String, ShellError>;
}

pub struct RemoteShellHandler {
    runner: Arc<dyn ShellRunner>,
    policy: RetryPolicy,
}

impl RemoteShellHandler {
    pub fn new(runner: Arc<dyn ShellRunner>, policy: RetryPolicy) -> Self {
        Self { runner, policy }
    }
}

#[async_trait::async_trait]
impl StepHandler for RemoteShellHandler {
    #[instrument(skip(self, store), fields(node_id = %node_id))]
    async fn handle(&self, node_id: Uuid, store: &dyn Store) -> Result<()> {
        let node = store.node(node_id).await?;
        if node.is_terminal() {
            return Ok(());
        }

        let TaskPayload::RemoteShell { command } = node.task_metadata.clone() else {
            return Err(StratusError::Validation(
                "remote shell payload malformed".to_string(),
            ));
        };

        let shell_outcome =
            run_with_retry(self.policy, |_| self.runner.run(&command)).await;

        let outcome = match shell_outcome {
            ShellOutcome::Completed(output) => StepOutcome::Successful {
                result: serde_json::json!({ "output": output }),
                warning: None,
            },
            ShellOutcome::Exhausted {
                attempts,
                last_error,
            } => StepOutcome::Failed {
                message: format!("gave up after {attempts} attempts: {last_error}"),
                kind: FailureKind::Handler,
            },
            ShellOutcome::Fatal(message) => StepOutcome::Failed {
                message,
                kind: FailureKind::Handler,
            },
        };

        commit_outcome(store, node, outcome).await
    }
}
