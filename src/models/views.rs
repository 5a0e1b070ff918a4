//! Serialized read model consumed by the API layer.
//!
//! The API surface itself lives outside this crate; these views define the
//! wire shape it reads, with edge relations flattened into id lists.

use crate::constants::{NodeStatus, RootStatus, TaskType, WorkflowNature};
use crate::handlers::TaskPayload;
use crate::models::{Root, TaskNode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootView {
    pub id: Uuid,
    pub workflow_name: String,
    pub resource_type: String,
    pub workflow_nature: WorkflowNature,
    pub fe_request_data: serde_json::Value,
    pub status: RootStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub previous_root_ids: Vec<Uuid>,
    pub next_root_ids: Vec<Uuid>,
}

impl RootView {
    pub fn from_parts(root: Root, previous_root_ids: Vec<Uuid>, next_root_ids: Vec<Uuid>) -> Self {
        Self {
            id: root.id,
            workflow_name: root.workflow_name,
            resource_type: root.resource_type,
            workflow_nature: root.workflow_nature,
            fe_request_data: root.fe_request_data,
            status: root.status,
            created_at: root.created_at,
            completed_at: root.completed_at,
            previous_root_ids,
            next_root_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNodeView {
    pub id: Uuid,
    pub status: Option<NodeStatus>,
    pub message: Option<String>,
    /// Operator-facing rendering of `message`; raw text when no known
    /// failure pattern matches
    pub display_message: Option<String>,
    pub resource_id: Option<Uuid>,
    pub resource_type: String,
    pub task_type: TaskType,
    pub previous_task_ids: Vec<Uuid>,
    pub next_task_ids: Vec<Uuid>,
    pub result: Option<serde_json::Value>,
    pub task_metadata: TaskPayload,
}

impl TaskNodeView {
    pub fn from_parts(
        node: TaskNode,
        previous_task_ids: Vec<Uuid>,
        next_task_ids: Vec<Uuid>,
    ) -> Self {
        let display_message = node
            .message
            .as_deref()
            .map(crate::orchestration::display_message);
        Self {
            id: node.id,
            status: node.status,
            message: node.message,
            display_message,
            resource_id: node.resource_id,
            resource_type: node.resource_type,
            task_type: node.task_type,
            previous_task_ids,
            next_task_ids,
            result: node.result,
            task_metadata: node.task_metadata,
        }
    }
}
