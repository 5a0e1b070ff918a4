//! Viable node discovery.
//!
//! Pull-side of dispatch: scan a root's nodes for those eligible to run right
//! now. Used to seed a fresh root and to recover after a restart; steady-state
//! propagation goes through the result processor's push model instead.

use crate::constants::events;
use crate::error::Result;
use crate::events::EventPublisher;
use crate::models::TaskNode;
use crate::store::Store;
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct ViableNodeDiscovery {
    store: std::sync::Arc<dyn Store>,
    publisher: EventPublisher,
}

impl ViableNodeDiscovery {
    pub fn new(store: std::sync::Arc<dyn Store>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    /// Nodes of `root_id` that are dispatchable now: never dispatched, with
    /// every predecessor SUCCESSFUL. Capped at `limit` per call.
    #[instrument(skip(self), fields(root_id = %root_id))]
    pub async fn discover(&self, root_id: Uuid, limit: usize) -> Result<Vec<TaskNode>> {
        let nodes = self.store.nodes_for_root(root_id).await?;

        let mut viable = Vec::new();
        for node in nodes {
            if !node.is_unstarted() {
                continue;
            }
            let predecessors = self.store.node_predecessors(node.id).await?;
            if predecessors.iter().all(TaskNode::satisfies_dependencies) {
                viable.push(node);
                if viable.len() >= limit {
                    break;
                }
            }
        }

        if viable.is_empty() {
            self.publisher
                .publish(events::NO_VIABLE_NODES, json!({ "root_id": root_id }));
        } else {
            debug!(count = viable.len(), "discovered viable nodes");
            self.publisher.publish(
                events::VIABLE_NODES_DISCOVERED,
                json!({
                    "root_id": root_id,
                    "node_ids": viable.iter().map(|n| n.id).collect::<Vec<_>>(),
                }),
            );
        }
        Ok(viable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{resource_types, NodeStatus, TaskType, WorkflowNature};
    use crate::graph::TaskGraph;
    use crate::handlers::TaskPayload;
    use crate::models::Root;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn node(task_type: TaskType, resource_type: &str) -> TaskNode {
        TaskNode::new(task_type, resource_type, TaskPayload::Empty)
    }

    #[tokio::test]
    async fn test_only_entry_nodes_viable_on_fresh_root() {
        let store = Arc::new(MemoryStore::new());
        let root = Root::new(
            "create network",
            resource_types::NETWORK,
            WorkflowNature::Create,
            serde_json::json!({}),
        );

        let mut graph = TaskGraph::new();
        let validate = graph
            .add_next(node(TaskType::Validate, resource_types::NETWORK))
            .unwrap();
        let create = graph
            .add_next(node(TaskType::Create, resource_types::NETWORK))
            .unwrap();
        store.commit_graph(&root, &graph).await.unwrap();

        let discovery = ViableNodeDiscovery::new(store.clone(), EventPublisher::new(16));
        let viable = discovery.discover(root.id, 10).await.unwrap();
        assert_eq!(viable.len(), 1);
        assert_eq!(viable[0].id, validate);

        // complete the validation, the create becomes viable
        let mut validated = store.node(validate).await.unwrap();
        validated.mark_successful(serde_json::json!({}), None);
        store.update_node(&validated).await.unwrap();

        let viable = discovery.discover(root.id, 10).await.unwrap();
        assert_eq!(viable.len(), 1);
        assert_eq!(viable[0].id, create);
    }

    #[tokio::test]
    async fn test_failed_predecessor_yields_nothing() {
        let store = Arc::new(MemoryStore::new());
        let publisher = EventPublisher::new(16);
        let mut rx = publisher.subscribe();

        let root = Root::new(
            "create subnet",
            resource_types::SUBNET,
            WorkflowNature::Create,
            serde_json::json!({}),
        );
        let mut graph = TaskGraph::new();
        let validate = graph
            .add_next(node(TaskType::Validate, resource_types::SUBNET))
            .unwrap();
        graph
            .add_next(node(TaskType::Create, resource_types::SUBNET))
            .unwrap();
        graph.node_mut(validate).unwrap().status = Some(NodeStatus::Failed);
        store.commit_graph(&root, &graph).await.unwrap();

        let discovery = ViableNodeDiscovery::new(store, publisher);
        let viable = discovery.discover(root.id, 10).await.unwrap();
        assert!(viable.is_empty());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, events::NO_VIABLE_NODES);
    }
}
