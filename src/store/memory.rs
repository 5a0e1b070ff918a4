//! In-memory store.
//!
//! Backs unit and integration tests, and embedded single-process use. A
//! single lock around the whole state gives the same atomicity the Postgres
//! store gets from transactions.

use crate::constants::RootStatus;
use crate::error::{Result, StratusError};
use crate::graph::TaskGraph;
use crate::models::{CloudAccount, Root, TaskNode, Workspace};
use crate::store::Store;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    roots: HashMap<Uuid, Root>,
    root_edges: HashSet<(Uuid, Uuid)>,
    nodes: HashMap<Uuid, TaskNode>,
    node_edges: HashSet<(Uuid, Uuid)>,
    workspaces: HashMap<Uuid, Workspace>,
    accounts: HashMap<Uuid, CloudAccount>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored root, ordered by creation time. Embedded callers have no
    /// SQL to reach for; this is their listing query.
    pub fn all_roots(&self) -> Vec<Root> {
        let mut roots: Vec<Root> = self.inner.read().roots.values().cloned().collect();
        roots.sort_by_key(|r| r.created_at);
        roots
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn create_root(&self, root: &Root) -> Result<()> {
        self.inner.write().roots.insert(root.id, root.clone());
        Ok(())
    }

    async fn root(&self, id: Uuid) -> Result<Root> {
        self.inner
            .read()
            .roots
            .get(&id)
            .cloned()
            .ok_or(StratusError::RootNotFound(id))
    }

    async fn update_root_status(
        &self,
        id: Uuid,
        status: RootStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let root = inner
            .roots
            .get_mut(&id)
            .ok_or(StratusError::RootNotFound(id))?;
        root.status = status;
        if completed_at.is_some() {
            root.completed_at = completed_at;
        }
        Ok(())
    }

    async fn link_roots(&self, from: Uuid, to: Uuid) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.roots.contains_key(&from) {
            return Err(StratusError::RootNotFound(from));
        }
        if !inner.roots.contains_key(&to) {
            return Err(StratusError::RootNotFound(to));
        }
        inner.root_edges.insert((from, to));
        Ok(())
    }

    async fn root_links(&self, id: Uuid) -> Result<(Vec<Uuid>, Vec<Uuid>)> {
        let inner = self.inner.read();
        let previous = inner
            .root_edges
            .iter()
            .filter(|(_, to)| *to == id)
            .map(|(from, _)| *from)
            .collect();
        let next = inner
            .root_edges
            .iter()
            .filter(|(from, _)| *from == id)
            .map(|(_, to)| *to)
            .collect();
        Ok((previous, next))
    }

    async fn commit_graph(&self, root: &Root, graph: &TaskGraph) -> Result<()> {
        let mut inner = self.inner.write();
        inner.roots.insert(root.id, root.clone());
        for node in graph.nodes() {
            let mut node = node.clone();
            node.root_id = root.id;
            inner.nodes.insert(node.id, node);
        }
        for (from, to) in graph.edges() {
            inner.node_edges.insert((from, to));
        }
        Ok(())
    }

    async fn node(&self, id: Uuid) -> Result<TaskNode> {
        self.inner
            .read()
            .nodes
            .get(&id)
            .cloned()
            .ok_or(StratusError::NodeNotFound(id))
    }

    async fn nodes_for_root(&self, root_id: Uuid) -> Result<Vec<TaskNode>> {
        let inner = self.inner.read();
        let mut nodes: Vec<TaskNode> = inner
            .nodes
            .values()
            .filter(|n| n.root_id == root_id)
            .cloned()
            .collect();
        nodes.sort_by_key(|n| n.created_at);
        Ok(nodes)
    }

    async fn update_node(&self, node: &TaskNode) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(&node.id) {
            return Err(StratusError::NodeNotFound(node.id));
        }
        inner.nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn node_predecessors(&self, id: Uuid) -> Result<Vec<TaskNode>> {
        let inner = self.inner.read();
        Ok(inner
            .node_edges
            .iter()
            .filter(|(_, to)| *to == id)
            .filter_map(|(from, _)| inner.nodes.get(from))
            .cloned()
            .collect())
    }

    async fn node_successors(&self, id: Uuid) -> Result<Vec<TaskNode>> {
        let inner = self.inner.read();
        Ok(inner
            .node_edges
            .iter()
            .filter(|(from, _)| *from == id)
            .filter_map(|(_, to)| inner.nodes.get(to))
            .cloned()
            .collect())
    }

    async fn create_workspace(&self, workspace: &Workspace) -> Result<()> {
        self.inner
            .write()
            .workspaces
            .insert(workspace.id, workspace.clone());
        Ok(())
    }

    async fn workspace(&self, id: Uuid) -> Result<Workspace> {
        self.inner
            .read()
            .workspaces
            .get(&id)
            .cloned()
            .ok_or(StratusError::WorkspaceNotFound(id))
    }

    async fn update_workspace(&self, workspace: &Workspace) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.workspaces.contains_key(&workspace.id) {
            return Err(StratusError::WorkspaceNotFound(workspace.id));
        }
        inner.workspaces.insert(workspace.id, workspace.clone());
        Ok(())
    }

    async fn delete_workspace(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write();
        inner
            .workspaces
            .remove(&id)
            .ok_or(StratusError::WorkspaceNotFound(id))?;
        Ok(())
    }

    async fn upsert_cloud_account(&self, account: &CloudAccount) -> Result<()> {
        self.inner
            .write()
            .accounts
            .insert(account.id, account.clone());
        Ok(())
    }

    async fn cloud_account(&self, id: Uuid) -> Result<CloudAccount> {
        self.inner
            .read()
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StratusError::AccountNotFound(id))
    }

    async fn mark_account_invalid(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write();
        let account = inner
            .accounts
            .get_mut(&id)
            .ok_or(StratusError::AccountNotFound(id))?;
        account.valid = false;
        Ok(())
    }

    async fn accounts_marked_for_deletion(&self) -> Result<Vec<CloudAccount>> {
        Ok(self
            .inner
            .read()
            .accounts
            .values()
            .filter(|a| a.marked_for_deletion)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{resource_types, TaskType, WorkflowNature};
    use crate::handlers::payload::{NetworkSpec, TaskPayload};

    #[tokio::test]
    async fn test_task_metadata_round_trip() {
        let store = MemoryStore::new();
        let root = Root::new(
            "create network",
            resource_types::NETWORK,
            WorkflowNature::Create,
            serde_json::json!({}),
        );

        let metadata = TaskPayload::CreateNetwork {
            spec: NetworkSpec {
                name: "prod-vpc".to_string(),
                cidr: "10.0.0.0/16".to_string(),
                region: "eu-west".to_string(),
            },
            provider_id: None,
        };
        let mut graph = TaskGraph::new();
        let node_id = graph
            .add_next(TaskNode::new(
                TaskType::Create,
                resource_types::NETWORK,
                metadata.clone(),
            ))
            .unwrap();

        store.commit_graph(&root, &graph).await.unwrap();

        let read_back = store.node(node_id).await.unwrap();
        assert_eq!(read_back.task_metadata, metadata);
        assert_eq!(read_back.root_id, root.id);
    }

    #[tokio::test]
    async fn test_graph_commit_persists_edges() {
        let store = MemoryStore::new();
        let root = Root::new(
            "delete subnet",
            resource_types::SUBNET,
            WorkflowNature::Delete,
            serde_json::json!({}),
        );

        let mut graph = TaskGraph::new();
        let a = graph
            .add_next(TaskNode::new(
                TaskType::Delete,
                resource_types::INSTANCE,
                TaskPayload::Empty,
            ))
            .unwrap();
        let b = graph
            .add_next(TaskNode::new(
                TaskType::Delete,
                resource_types::SUBNET,
                TaskPayload::Empty,
            ))
            .unwrap();

        store.commit_graph(&root, &graph).await.unwrap();

        let preds = store.node_predecessors(b).await.unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].id, a);

        let succs = store.node_successors(a).await.unwrap();
        assert_eq!(succs.len(), 1);
        assert_eq!(succs[0].id, b);
    }

    #[tokio::test]
    async fn test_root_links_feed_the_read_model() {
        let store = MemoryStore::new();
        let restore = Root::new(
            "restore network",
            resource_types::NETWORK,
            WorkflowNature::Restore,
            serde_json::json!({}),
        );
        let translate = Root::new(
            "translate network",
            resource_types::NETWORK,
            WorkflowNature::Translation,
            serde_json::json!({}),
        );
        store.create_root(&restore).await.unwrap();
        store.create_root(&translate).await.unwrap();

        store.link_roots(restore.id, translate.id).await.unwrap();

        let (previous, next) = store.root_links(translate.id).await.unwrap();
        assert_eq!(previous, vec![restore.id]);
        assert!(next.is_empty());

        let view = crate::models::RootView::from_parts(translate.clone(), previous, next);
        assert_eq!(view.previous_root_ids, vec![restore.id]);

        let err = store
            .link_roots(restore.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StratusError::RootNotFound(_)));
    }

    #[tokio::test]
    async fn test_account_invalidation() {
        let store = MemoryStore::new();
        let account = CloudAccount::new("acme-prod");
        store.upsert_cloud_account(&account).await.unwrap();

        store.mark_account_invalid(account.id).await.unwrap();
        let read_back = store.cloud_account(account.id).await.unwrap();
        assert!(!read_back.valid);
    }
}
