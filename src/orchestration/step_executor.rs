//! Step execution.
//!
//! Resolves a node's handler binding and invokes it, with the one invariant
//! every worker must uphold: an error escaping a handler becomes a FAILED
//! node plus message, never a crashed dispatch loop.

use crate::constants::{events, NodeStatus};
use crate::error::Result;
use crate::events::EventPublisher;
use crate::registry::HandlerRegistry;
use crate::store::Store;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

pub struct StepExecutor {
    store: Arc<dyn Store>,
    registry: Arc<HandlerRegistry>,
    publisher: EventPublisher,
}

impl StepExecutor {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<HandlerRegistry>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            registry,
            publisher,
        }
    }

    /// Run one node to its next status.
    ///
    /// A never-dispatched node is stamped RUNNING before the handler is
    /// invoked; a RUNNING_WAIT node re-enters its handler's wait phase
    /// untouched. Handler and binding errors are committed onto the node.
    #[instrument(skip(self), fields(node_id = %node_id))]
    pub async fn execute(&self, node_id: Uuid) -> Result<()> {
        let mut node = self.store.node(node_id).await?;
        if node.is_terminal() {
            return Ok(());
        }

        let handler = match self
            .registry
            .resolve(node.task_type, &node.resource_type)
        {
            Ok(handler) => handler,
            Err(err) => {
                error!(error = %err, "no handler bound, failing node");
                node.mark_failed(err.to_string());
                self.store.update_node(&node).await?;
                self.publish_transition(&node.root_id, node_id, Some(NodeStatus::Failed));
                return Ok(());
            }
        };

        if node.is_unstarted() {
            node.mark_running();
            self.store.update_node(&node).await?;
            self.publisher.publish(
                events::NODE_DISPATCHED,
                json!({ "root_id": node.root_id, "node_id": node_id }),
            );
        }

        if let Err(err) = handler.handle(node_id, self.store.as_ref()).await {
            error!(error = %err, "handler raised, failing node");
            let mut node = self.store.node(node_id).await?;
            node.mark_failed(err.to_string());
            self.store.update_node(&node).await?;
        }

        let node = self.store.node(node_id).await?;
        info!(status = ?node.status, "node transition committed");
        self.publish_transition(&node.root_id, node_id, node.status);
        Ok(())
    }

    fn publish_transition(&self, root_id: &Uuid, node_id: Uuid, status: Option<NodeStatus>) {
        let name = match status {
            Some(NodeStatus::Successful) => events::NODE_COMPLETED,
            Some(NodeStatus::Failed) => events::NODE_FAILED,
            Some(NodeStatus::RunningWait) => events::NODE_WAITING,
            _ => return,
        };
        self.publisher
            .publish(name, json!({ "root_id": root_id, "node_id": node_id }));
    }
}
