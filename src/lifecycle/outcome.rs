//! Step outcome types shared by the action and wait phases.

use crate::error::ProviderError;
use serde_json::Value;

/// Which error category produced a failure outcome. Drives the one side
/// effect that reaches past the node itself: an auth rejection marks the
/// owning cloud account invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    Connect,
    Execute,
    InvalidRequest,
    /// Failure raised inside the handler rather than at the provider boundary
    Handler,
}

impl FailureKind {
    pub fn from_provider_error(err: &ProviderError) -> Self {
        match err {
            ProviderError::Auth { .. } => Self::Auth,
            ProviderError::Connect { .. } => Self::Connect,
            ProviderError::Execute { .. } => Self::Execute,
            ProviderError::InvalidRequest { .. } => Self::InvalidRequest,
        }
    }
}

/// Three-way result of one handler invocation against the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Terminal success; `warning` carries the reconciliation notice when a
    /// related local record could not be resolved
    Successful {
        result: Value,
        warning: Option<String>,
    },
    /// Provider still converging; the node stays re-dispatchable and the
    /// provider id is stashed for the wait phase
    Waiting { provider_id: String },
    /// Terminal failure with the most specific available diagnostic
    Failed {
        message: String,
        kind: FailureKind,
    },
}

impl StepOutcome {
    pub fn failed_from(err: &ProviderError) -> Self {
        Self::Failed {
            message: err.to_string(),
            kind: FailureKind::from_provider_error(err),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Waiting { .. })
    }
}
