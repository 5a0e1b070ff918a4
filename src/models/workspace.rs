//! Workspace records.

use crate::constants::WorkspaceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A grouping of roots created together in one bulk request, supporting
/// coordinated and partial (re-)execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub status: WorkspaceStatus,
    /// Member roots, one per resource collection in the bulk payload
    pub root_ids: Vec<Uuid>,
    /// The subset most recently (re)triggered, for later status queries
    pub recently_provisioned_roots: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: impl Into<String>, root_ids: Vec<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            user_id: None,
            project_id: None,
            status: WorkspaceStatus::Created,
            root_ids,
            recently_provisioned_roots: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_owner(mut self, user_id: Uuid, project_id: Option<Uuid>) -> Self {
        self.user_id = Some(user_id);
        self.project_id = project_id;
        self
    }
}
