//! Provider client boundary.
//!
//! The concrete cloud provider lives outside this core. Every call either
//! returns structured resource data carrying the provider's own lifecycle
//! indicator, or one of the typed [`ProviderError`](crate::error::ProviderError)
//! variants.

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured data the provider returns for a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResource {
    /// Provider-assigned identifier, used for all later polling
    pub provider_id: String,
    /// Raw lifecycle indicator as reported by the provider
    pub lifecycle_state: String,
    /// Full resource representation
    #[serde(default)]
    pub attributes: serde_json::Value,
    /// Provider ids of related resources learned from this call (e.g. the
    /// subnets a new load balancer was placed into)
    #[serde(default)]
    pub related_provider_ids: Vec<String>,
}

/// Classification of a provider lifecycle indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Operation finished, resource usable (or gone, for deletions)
    TerminalSuccess,
    /// Provider reports the operation failed
    TerminalFailure,
    /// Provider is still converging; poll again later
    InProgress,
}

/// Map a provider's lifecycle indicator onto the three-way outcome the
/// engine understands. Unknown indicators are treated as in-progress so an
/// unfamiliar transitional state never terminates a node prematurely.
pub fn classify_lifecycle(state: &str) -> LifecyclePhase {
    match state {
        "available" | "active" | "running" | "stable" | "deleted" => {
            LifecyclePhase::TerminalSuccess
        }
        "failed" | "error" | "create_failed" | "delete_failed" => LifecyclePhase::TerminalFailure,
        _ => LifecyclePhase::InProgress,
    }
}

/// Opaque remote calls against the external cloud provider.
///
/// One invocation of a step handler performs exactly one of these calls:
/// the action phase a mutating call, the wait phase a poll.
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    /// Issue the mutating creation call for a resource
    async fn create_resource(
        &self,
        resource_type: &str,
        spec: &serde_json::Value,
    ) -> std::result::Result<ProviderResource, ProviderError>;

    /// Issue the mutating deletion call for a resource
    async fn delete_resource(
        &self,
        resource_type: &str,
        provider_id: &str,
    ) -> std::result::Result<ProviderResource, ProviderError>;

    /// Detach a shared resource from one referencer
    async fn detach_resource(
        &self,
        resource_type: &str,
        provider_id: &str,
        from_provider_id: &str,
    ) -> std::result::Result<ProviderResource, ProviderError>;

    /// Poll the current state of a resource
    async fn poll_resource(
        &self,
        resource_type: &str,
        provider_id: &str,
    ) -> std::result::Result<ProviderResource, ProviderError>;
}

/// Resolves provider-side identifiers back to locally tracked resources
/// during wait-phase reconciliation.
#[async_trait::async_trait]
pub trait RelatedResourceResolver: Send + Sync {
    /// Local record id for a provider id, or None when the record is not yet
    /// tracked locally
    async fn resolve(
        &self,
        resource_type: &str,
        provider_id: &str,
    ) -> crate::error::Result<Option<Uuid>>;
}
