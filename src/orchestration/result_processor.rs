//! Result processing and status propagation.
//!
//! The push half of the dispatch model: after every node transition, enqueue
//! whatever just became dispatchable and recompute the owning root's
//! aggregate status. Waiting nodes are re-enqueued so the wait phase gets its
//! next poll without a background scanner.

use crate::constants::{events, NodeStatus, RootStatus};
use crate::error::Result;
use crate::events::EventPublisher;
use crate::graph::derive_root_status;
use crate::models::TaskNode;
use crate::store::Store;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Where newly dispatchable node ids go. The queue itself lives outside the
/// core; tests and embedded callers supply a synchronous collector.
#[async_trait::async_trait]
pub trait Enqueuer: Send + Sync {
    async fn enqueue(&self, node_id: Uuid) -> Result<()>;
}

pub struct ResultProcessor {
    store: Arc<dyn Store>,
    publisher: EventPublisher,
}

impl ResultProcessor {
    pub fn new(store: Arc<dyn Store>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    /// Process one committed node transition: propagate readiness, then
    /// refresh the root aggregate.
    #[instrument(skip(self, enqueuer), fields(node_id = %node_id))]
    pub async fn process(&self, node_id: Uuid, enqueuer: &dyn Enqueuer) -> Result<()> {
        let node = self.store.node(node_id).await?;

        match node.status {
            Some(NodeStatus::Successful) => {
                for ready in self.newly_ready_successors(&node).await? {
                    debug!(successor = %ready, "successor became dispatchable");
                    enqueuer.enqueue(ready).await?;
                }
            }
            Some(NodeStatus::RunningWait) => {
                // re-enqueue for the next poll of the wait phase
                enqueuer.enqueue(node_id).await?;
            }
            _ => {}
        }

        self.refresh_root(node.root_id).await?;
        Ok(())
    }

    /// Immediate successors of `node` that are now dispatchable. A FAILED or
    /// still-running node never frees anything.
    async fn newly_ready_successors(&self, node: &TaskNode) -> Result<Vec<Uuid>> {
        if !node.satisfies_dependencies() {
            return Ok(Vec::new());
        }
        let mut ready = Vec::new();
        for successor in self.store.node_successors(node.id).await? {
            if !successor.is_unstarted() {
                continue;
            }
            let predecessors = self.store.node_predecessors(successor.id).await?;
            if predecessors.iter().all(TaskNode::satisfies_dependencies) {
                ready.push(successor.id);
            }
        }
        Ok(ready)
    }

    /// Recompute the aggregate status and persist it when it moved. Final
    /// statuses get a completion timestamp and a terminal event.
    pub async fn refresh_root(&self, root_id: Uuid) -> Result<RootStatus> {
        let root = self.store.root(root_id).await?;
        let nodes = self.store.nodes_for_root(root_id).await?;
        let derived = derive_root_status(root.status, nodes.iter().map(|n| n.status));

        if derived == root.status {
            return Ok(derived);
        }

        let completed_at = derived.is_final().then(Utc::now);
        self.store
            .update_root_status(root_id, derived, completed_at)
            .await?;
        info!(root_id = %root_id, from = %root.status, to = %derived, "root status moved");

        let event = match derived {
            RootStatus::Running => Some(events::ROOT_STARTED),
            RootStatus::CompletedSuccessfully => Some(events::ROOT_COMPLETED),
            RootStatus::CompletedWithFailure => Some(events::ROOT_FAILED),
            _ => None,
        };
        if let Some(name) = event {
            self.publisher
                .publish(name, json!({ "root_id": root_id, "status": derived.to_string() }));
        }

        if derived == RootStatus::CompletedSuccessfully {
            self.release_linked_successors(root_id).await?;
        }
        Ok(derived)
    }

    /// Roots chained behind `root_id` wait in PENDING; once every linked
    /// predecessor has completed successfully they move to READY for the
    /// dispatcher to pick up.
    async fn release_linked_successors(&self, root_id: Uuid) -> Result<()> {
        let (_, next) = self.store.root_links(root_id).await?;
        for successor in next {
            if self.store.root(successor).await?.status != RootStatus::Pending {
                continue;
            }
            let (previous, _) = self.store.root_links(successor).await?;
            let mut blocked = false;
            for predecessor in previous {
                if self.store.root(predecessor).await?.status
                    != RootStatus::CompletedSuccessfully
                {
                    blocked = true;
                    break;
                }
            }
            if !blocked {
                self.store
                    .update_root_status(successor, RootStatus::Ready, None)
                    .await?;
                info!(root_id = %successor, after = %root_id, "chained root released");
            }
        }
        Ok(())
    }
}
