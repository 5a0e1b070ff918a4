//! # Step Handler Contract
//!
//! A step handler is the pluggable strategy bound to one
//! (task type, resource type) pair. It is invoked with a task node id, loads
//! the node, interprets `task_metadata` as its input, performs exactly one
//! external call per invocation, and commits the resulting status directly to
//! the persisted node. Completion is observed only through the persisted
//! state; nothing is returned to the dispatcher.

pub mod payload;

pub use payload::TaskPayload;

use crate::error::Result;
use crate::store::Store;
use uuid::Uuid;

/// Pluggable, resource-specific operation logic invoked by the engine.
///
/// Implementations must never let an error escape: any provider or internal
/// failure is converted into a FAILED node with a diagnostic message. The
/// [`StepExecutor`](crate::orchestration::StepExecutor) enforces this as a
/// last line of defense, but handlers own the conversion.
#[async_trait::async_trait]
pub trait StepHandler: Send + Sync {
    /// Execute one unit of work for the given node and persist the outcome
    async fn handle(&self, node_id: Uuid, store: &dyn Store) -> Result<()>;
}
