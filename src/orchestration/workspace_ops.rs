//! Workspace operations.
//!
//! Bulk create/provision/delete over a group of roots. Creation parks every
//! member ON_HOLD; provisioning releases them (all, or a caller-chosen
//! subset) to the dispatcher and records which subset was last triggered so
//! later status queries can scope themselves to it.

use crate::constants::{events, status_groups, RootStatus, WorkspaceStatus};
use crate::error::{Result, StratusError};
use crate::events::EventPublisher;
use crate::graph::{derive_workspace_status, TaskGraph};
use crate::models::{Root, Workspace};
use crate::store::Store;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// One member root to be created inside a workspace: the root record plus
/// its fully built task graph.
pub struct RootSeed {
    pub root: Root,
    pub graph: TaskGraph,
}

impl RootSeed {
    pub fn new(root: Root, graph: TaskGraph) -> Self {
        Self { root, graph }
    }
}

pub struct WorkspaceOps {
    store: Arc<dyn Store>,
    publisher: EventPublisher,
}

impl WorkspaceOps {
    pub fn new(store: Arc<dyn Store>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    /// Create a workspace from one bulk request: every seed becomes a member
    /// root parked ON_HOLD with its graph committed, so nothing runs until
    /// provisioning is requested.
    #[instrument(skip(self, seeds), fields(name = %name))]
    pub async fn create_workspace(
        &self,
        name: &str,
        seeds: Vec<RootSeed>,
        user_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> Result<Workspace> {
        let mut root_ids = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let root = seed.root.with_status(RootStatus::OnHold);
            self.store.commit_graph(&root, &seed.graph).await?;
            root_ids.push(root.id);
        }

        let mut workspace = Workspace::new(name, root_ids);
        if let Some(user_id) = user_id {
            workspace = workspace.with_owner(user_id, project_id);
        }
        self.store.create_workspace(&workspace).await?;
        info!(workspace_id = %workspace.id, members = workspace.root_ids.len(), "workspace created");
        Ok(workspace)
    }

    /// Release every member root to the dispatcher.
    pub async fn provision_workspace(&self, workspace_id: Uuid) -> Result<Vec<Uuid>> {
        let workspace = self.store.workspace(workspace_id).await?;
        let all = workspace.root_ids.clone();
        self.provision_subset(workspace, &all).await
    }

    /// Release a caller-chosen subset of member roots. Members already
    /// running or already completed successfully are skipped; the requested
    /// subset is recorded as-is for later status queries.
    pub async fn provision_roots(
        &self,
        workspace_id: Uuid,
        requested: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let workspace = self.store.workspace(workspace_id).await?;
        let members: HashSet<Uuid> = workspace.root_ids.iter().copied().collect();
        if let Some(stranger) = requested.iter().find(|id| !members.contains(id)) {
            return Err(StratusError::Validation(format!(
                "root {stranger} is not a member of workspace {workspace_id}"
            )));
        }
        self.provision_subset(workspace, requested).await
    }

    #[instrument(skip(self, workspace), fields(workspace_id = %workspace.id))]
    async fn provision_subset(
        &self,
        mut workspace: Workspace,
        requested: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let mut released = Vec::new();
        for root_id in requested {
            let root = self.store.root(*root_id).await?;
            if status_groups::ROOT_SKIP_REPROVISION_STATUSES.contains(&root.status) {
                debug!(root_id = %root_id, status = %root.status, "skipping re-provision");
                continue;
            }
            // a root chained behind another stays queued until its linked
            // predecessors finish; the result processor releases it then
            if self.has_unfinished_predecessor(*root_id).await? {
                debug!(root_id = %root_id, "queued behind an unfinished linked root");
                self.store
                    .update_root_status(*root_id, RootStatus::Pending, None)
                    .await?;
                continue;
            }
            self.store
                .update_root_status(*root_id, RootStatus::Ready, None)
                .await?;
            released.push(*root_id);
        }

        workspace.status = WorkspaceStatus::Pending;
        workspace.recently_provisioned_roots = requested.to_vec();
        workspace.updated_at = Utc::now();
        self.store.update_workspace(&workspace).await?;

        self.publisher.publish(
            events::WORKSPACE_PROVISION_REQUESTED,
            json!({
                "workspace_id": workspace.id,
                "requested": requested,
                "released": released,
            }),
        );
        info!(released = released.len(), requested = requested.len(), "workspace provisioning requested");
        Ok(released)
    }

    async fn has_unfinished_predecessor(&self, root_id: Uuid) -> Result<bool> {
        let (previous, _) = self.store.root_links(root_id).await?;
        for predecessor in previous {
            let status = self.store.root(predecessor).await?.status;
            if status != RootStatus::CompletedSuccessfully {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Delete a workspace record. Refused while any member root is actively
    /// running; parked and completed members do not block deletion.
    pub async fn delete_workspace(&self, workspace_id: Uuid) -> Result<()> {
        let workspace = self.store.workspace(workspace_id).await?;
        for root_id in &workspace.root_ids {
            let root = self.store.root(*root_id).await?;
            if root.status == RootStatus::Running {
                warn!(workspace_id = %workspace_id, root_id = %root_id, "deletion refused, member still running");
                return Err(StratusError::WorkspaceBusy {
                    workspace_id,
                    root_id: *root_id,
                });
            }
        }

        self.store.delete_workspace(workspace_id).await?;
        self.publisher.publish(
            events::WORKSPACE_DELETED,
            json!({ "workspace_id": workspace_id }),
        );
        Ok(())
    }

    /// Recompute the workspace aggregate over the most recently provisioned
    /// subset (or all members when nothing was ever provisioned), persisting
    /// it when it moved.
    pub async fn refresh_status(&self, workspace_id: Uuid) -> Result<WorkspaceStatus> {
        let mut workspace = self.store.workspace(workspace_id).await?;
        let scope = if workspace.recently_provisioned_roots.is_empty() {
            workspace.root_ids.clone()
        } else {
            workspace.recently_provisioned_roots.clone()
        };

        let roots =
            futures::future::try_join_all(scope.iter().map(|id| self.store.root(*id))).await?;

        let derived = derive_workspace_status(workspace.status, roots.iter().map(|r| r.status));
        if derived != workspace.status {
            workspace.status = derived;
            workspace.updated_at = Utc::now();
            self.store.update_workspace(&workspace).await?;
        }
        Ok(derived)
    }
}
