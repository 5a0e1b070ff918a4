//! Task node records.

use crate::constants::{NodeStatus, TaskType};
use crate::handlers::TaskPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One schedulable step within a root's DAG.
///
/// Dependency edges live in a separate directed edge relation, never on the
/// node itself; readiness is derived from predecessor statuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: Uuid,
    pub root_id: Uuid,
    pub task_type: TaskType,
    /// Handler binding tag; composite `"{child}-{parent}"` for attach/detach
    pub resource_type: String,
    /// Reference to the persisted domain resource this node concerns. Set at
    /// graph-construction time for deletions, only after the action phase
    /// succeeds for creations.
    pub resource_id: Option<Uuid>,
    /// None until the node is first dispatched
    pub status: Option<NodeStatus>,
    /// Failure or transitional diagnostic text
    pub message: Option<String>,
    /// Handler input, mutated by the handler across repeated invocations
    pub task_metadata: TaskPayload,
    /// Handler output once SUCCESSFUL
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskNode {
    /// Build a fresh, never-dispatched node
    pub fn new(task_type: TaskType, resource_type: impl Into<String>, metadata: TaskPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            root_id: Uuid::nil(),
            task_type,
            resource_type: resource_type.into(),
            resource_id: None,
            status: None,
            message: None,
            task_metadata: metadata,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the persisted domain resource this node concerns
    pub fn with_resource(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Back-fill a status at construction time. Used only by the deletion
    /// graph builder for prerequisites that are already satisfied.
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Check whether this node satisfies its successors' dependencies
    pub fn satisfies_dependencies(&self) -> bool {
        self.status
            .map(|s| s.satisfies_dependencies())
            .unwrap_or(false)
    }

    /// Check whether this node has never been dispatched
    pub fn is_unstarted(&self) -> bool {
        self.status.is_none()
    }

    /// Check whether this node reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.map(|s| s.is_terminal()).unwrap_or(false)
    }

    /// Commit a terminal success with its result payload
    pub fn mark_successful(&mut self, result: serde_json::Value, warning: Option<String>) {
        self.status = Some(NodeStatus::Successful);
        self.result = Some(result);
        self.message = warning;
        self.updated_at = Utc::now();
    }

    /// Commit a terminal failure with a diagnostic message
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = Some(NodeStatus::Failed);
        self.message = Some(message.into());
        self.updated_at = Utc::now();
    }

    /// Commit a still-converging status; the node stays re-dispatchable
    pub fn mark_waiting(&mut self) {
        self.status = Some(NodeStatus::RunningWait);
        self.updated_at = Utc::now();
    }

    /// Commit the start of an action-phase invocation
    pub fn mark_running(&mut self) {
        self.status = Some(NodeStatus::Running);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::resource_types;

    #[test]
    fn test_new_node_is_unstarted() {
        let node = TaskNode::new(TaskType::Create, resource_types::NETWORK, TaskPayload::Empty);
        assert!(node.is_unstarted());
        assert!(!node.is_terminal());
        assert!(!node.satisfies_dependencies());
    }

    #[test]
    fn test_terminal_transitions() {
        let mut node =
            TaskNode::new(TaskType::Delete, resource_types::SUBNET, TaskPayload::Empty);

        node.mark_waiting();
        assert!(!node.is_terminal());

        node.mark_successful(serde_json::json!({"id": "subnet-1"}), None);
        assert!(node.is_terminal());
        assert!(node.satisfies_dependencies());
        assert!(node.message.is_none());
    }

    #[test]
    fn test_failed_node_blocks_dependencies() {
        let mut node =
            TaskNode::new(TaskType::Create, resource_types::CLUSTER, TaskPayload::Empty);
        node.mark_failed("quota exceeded");
        assert!(node.is_terminal());
        assert!(!node.satisfies_dependencies());
        assert_eq!(node.message.as_deref(), Some("quota exceeded"));
    }
}
