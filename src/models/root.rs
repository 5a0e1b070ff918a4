//! Root records.

use crate::constants::{RootStatus, WorkflowNature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One logical operation's full task graph plus aggregate status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub id: Uuid,
    /// Display name, e.g. "create load balancer"
    pub workflow_name: String,
    /// Top-level resource kind this operation concerns
    pub resource_type: String,
    /// Free-form classification; not load-bearing for execution logic
    pub workflow_nature: WorkflowNature,
    /// Owning user, for access scoping only
    pub user_id: Option<Uuid>,
    /// Owning project, for access scoping only
    pub project_id: Option<Uuid>,
    /// Owning cloud account; marked invalid when the provider rejects credentials
    pub account_id: Option<Uuid>,
    /// Original request payload, retained for audit and replay
    pub fe_request_data: serde_json::Value,
    pub status: RootStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Root {
    pub fn new(
        workflow_name: impl Into<String>,
        resource_type: impl Into<String>,
        workflow_nature: WorkflowNature,
        fe_request_data: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_name: workflow_name.into(),
            resource_type: resource_type.into(),
            workflow_nature,
            user_id: None,
            project_id: None,
            account_id: None,
            fe_request_data,
            status: RootStatus::Initiated,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_owner(mut self, user_id: Uuid, project_id: Option<Uuid>) -> Self {
        self.user_id = Some(user_id);
        self.project_id = project_id;
        self
    }

    pub fn with_account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Park this root until a workspace or external trigger releases it
    pub fn with_status(mut self, status: RootStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }
}
