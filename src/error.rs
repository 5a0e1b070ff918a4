//! Error types for the provisioning engine.

use crate::constants::TaskType;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StratusError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Orchestration error: {0}")]
    Orchestration(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Event error: {0}")]
    Event(String),
    #[error("Root {0} not found")]
    RootNotFound(Uuid),
    #[error("Task node {0} not found")]
    NodeNotFound(Uuid),
    #[error("Workspace {0} not found")]
    WorkspaceNotFound(Uuid),
    #[error("Cloud account {0} not found")]
    AccountNotFound(Uuid),
    #[error("No handler registered for {task_type} on {resource_type}")]
    HandlerNotFound {
        task_type: TaskType,
        resource_type: String,
    },
    #[error("Workspace {workspace_id} cannot be deleted: root {root_id} is still running")]
    WorkspaceBusy {
        workspace_id: Uuid,
        root_id: Uuid,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<sqlx::Error> for StratusError {
    fn from(err: sqlx::Error) -> Self {
        StratusError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StratusError {
    fn from(err: serde_json::Error) -> Self {
        StratusError::Validation(format!("JSON serialization error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, StratusError>;

/// Errors raised by the in-memory task graph primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Node {0} is not part of this graph")]
    UnknownNode(Uuid),
    #[error("Node {0} is already part of this graph")]
    DuplicateNode(Uuid),
    #[error("Edge {from} -> {to} would create a cycle")]
    CycleDetected { from: Uuid, to: Uuid },
}

/// Typed failures at the provider-call boundary.
///
/// Every remote call a step handler makes resolves to structured data or one
/// of these variants; handlers convert them into a FAILED node plus message
/// rather than letting them escape a worker.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ProviderError {
    /// Credentials rejected; the owning cloud account is marked invalid so
    /// future operations short-circuit
    #[error("Provider authentication rejected: {message}")]
    Auth { message: String },
    /// Transport failure reaching the provider; operators resubmit, the
    /// engine does not retry
    #[error("Could not reach provider: {message}")]
    Connect { message: String },
    /// The provider accepted the request shape but the operation itself
    /// failed, with a provider status code and message
    #[error("Provider operation failed ({status_code}): {message}")]
    Execute { status_code: u16, message: String },
    /// The engine determined the request is not performable before any
    /// provider call was made
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ProviderError {
    /// A 404 on a delete-style call means the object is already gone and is
    /// treated as success
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Execute { status_code: 404, .. })
    }

    /// A 409 on a create-style call (name collision) is surfaced verbatim
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Execute { status_code: 409, .. })
    }
}
