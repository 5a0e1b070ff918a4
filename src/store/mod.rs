//! # Persistence Boundary
//!
//! The relational engine lives outside this core; everything the engine needs
//! from it is expressed through the [`Store`] trait. `PgStore` implements it
//! against Postgres, `MemoryStore` backs tests and embedded use. All node
//! mutations are committed per step; a whole task graph is always committed
//! in one transaction.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::Result;
use crate::graph::TaskGraph;
use crate::models::{CloudAccount, Root, TaskNode, Workspace};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Transactional read/write interface over the persisted orchestration state.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // --- roots ---

    async fn create_root(&self, root: &Root) -> Result<()>;

    async fn root(&self, id: Uuid) -> Result<Root>;

    async fn update_root_status(
        &self,
        id: Uuid,
        status: crate::constants::RootStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Chain two independent roots: `from` precedes `to`
    async fn link_roots(&self, from: Uuid, to: Uuid) -> Result<()>;

    /// (previous_root_ids, next_root_ids) for a root
    async fn root_links(&self, id: Uuid) -> Result<(Vec<Uuid>, Vec<Uuid>)>;

    // --- task graphs ---

    /// Persist a root together with its full node DAG in one transaction.
    /// Nodes are stamped with the root's id as they are written.
    async fn commit_graph(&self, root: &Root, graph: &TaskGraph) -> Result<()>;

    async fn node(&self, id: Uuid) -> Result<TaskNode>;

    async fn nodes_for_root(&self, root_id: Uuid) -> Result<Vec<TaskNode>>;

    /// Commit a node's status/message/metadata/result in one write
    async fn update_node(&self, node: &TaskNode) -> Result<()>;

    async fn node_predecessors(&self, id: Uuid) -> Result<Vec<TaskNode>>;

    async fn node_successors(&self, id: Uuid) -> Result<Vec<TaskNode>>;

    // --- workspaces ---

    async fn create_workspace(&self, workspace: &Workspace) -> Result<()>;

    async fn workspace(&self, id: Uuid) -> Result<Workspace>;

    async fn update_workspace(&self, workspace: &Workspace) -> Result<()>;

    async fn delete_workspace(&self, id: Uuid) -> Result<()>;

    // --- cloud accounts ---

    async fn upsert_cloud_account(&self, account: &CloudAccount) -> Result<()>;

    async fn cloud_account(&self, id: Uuid) -> Result<CloudAccount>;

    /// Short-circuit future operations for an account whose credentials the
    /// provider rejected
    async fn mark_account_invalid(&self, id: Uuid) -> Result<()>;

    async fn accounts_marked_for_deletion(&self) -> Result<Vec<CloudAccount>>;
}
