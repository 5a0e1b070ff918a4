//! # Task Graph Model
//!
//! In-memory DAG of task nodes with O(1) predecessor/successor lookup,
//! explicit graph-edit primitives, and the readiness rule that decides what
//! becomes dispatchable. The graph is built in memory and committed to the
//! store in one transaction so a partially built graph is never visible to
//! the dispatcher.

pub mod status;

pub use status::{derive_root_status, derive_workspace_status};

use crate::error::GraphError;
use crate::models::TaskNode;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// A root's dependency-ordered DAG of task nodes.
///
/// Edges always point from a predecessor to its dependent (`from` must be
/// SUCCESSFUL before `to` may be dispatched). Acyclicity is enforced on every
/// edge insertion.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: HashMap<Uuid, TaskNode>,
    predecessors: HashMap<Uuid, HashSet<Uuid>>,
    successors: HashMap<Uuid, HashSet<Uuid>>,
    /// Insertion order, kept for deterministic iteration and topo tie-breaks
    order: Vec<Uuid>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: Uuid) -> Option<&TaskNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: Uuid) -> Option<&mut TaskNode> {
        self.nodes.get_mut(&id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// All edges as (predecessor, dependent) pairs, in insertion order of the
    /// dependent
    pub fn edges(&self) -> Vec<(Uuid, Uuid)> {
        let mut edges = Vec::new();
        for id in &self.order {
            if let Some(preds) = self.predecessors.get(id) {
                for pred in preds {
                    edges.push((*pred, *id));
                }
            }
        }
        edges
    }

    pub fn predecessors_of(&self, id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.predecessors.get(&id).into_iter().flatten().copied()
    }

    pub fn successors_of(&self, id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.successors.get(&id).into_iter().flatten().copied()
    }

    /// Insert a node with no edges
    pub fn insert_node(&mut self, node: TaskNode) -> Result<Uuid, GraphError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.nodes.insert(id, node);
        self.predecessors.entry(id).or_default();
        self.successors.entry(id).or_default();
        self.order.push(id);
        Ok(id)
    }

    /// Add a dependency edge: `from` must complete before `to`
    pub fn add_edge(&mut self, from: Uuid, to: Uuid) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&from) {
            return Err(GraphError::UnknownNode(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(GraphError::UnknownNode(to));
        }
        if from == to || self.has_path(to, from) {
            return Err(GraphError::CycleDetected { from, to });
        }
        self.successors.entry(from).or_default().insert(to);
        self.predecessors.entry(to).or_default().insert(from);
        Ok(())
    }

    /// Append `node` as the sole entry point of an empty graph, or as a
    /// successor of every current terminal (no-successor) node. Used when
    /// steps are strictly sequential.
    pub fn add_next(&mut self, node: TaskNode) -> Result<Uuid, GraphError> {
        let terminals: Vec<Uuid> = self
            .order
            .iter()
            .filter(|id| {
                self.successors
                    .get(*id)
                    .map(|s| s.is_empty())
                    .unwrap_or(true)
            })
            .copied()
            .collect();

        let id = self.insert_node(node)?;
        for terminal in terminals {
            self.add_edge(terminal, id)?;
        }
        Ok(id)
    }

    /// Insert `dependency` ahead of an already-attached node, rewiring the
    /// node's existing predecessors to instead precede the dependency. Used
    /// when a validation or prerequisite step must slot in without disturbing
    /// the rest of the chain.
    pub fn add_previous(&mut self, node_id: Uuid, dependency: TaskNode) -> Result<Uuid, GraphError> {
        if !self.nodes.contains_key(&node_id) {
            return Err(GraphError::UnknownNode(node_id));
        }

        let old_preds: Vec<Uuid> = self.predecessors_of(node_id).collect();
        let dep_id = self.insert_node(dependency)?;

        for pred in &old_preds {
            self.successors.entry(*pred).or_default().remove(&node_id);
            self.predecessors.entry(node_id).or_default().remove(pred);
        }
        for pred in old_preds {
            self.add_edge(pred, dep_id)?;
        }
        self.add_edge(dep_id, node_id)?;
        Ok(dep_id)
    }

    /// Nodes eligible for dispatch right now: never run, with every
    /// predecessor SUCCESSFUL
    pub fn ready_nodes(&self) -> Vec<Uuid> {
        self.order
            .iter()
            .filter(|id| self.is_ready(**id))
            .copied()
            .collect()
    }

    /// Readiness rule for a single node
    pub fn is_ready(&self, id: Uuid) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        node.is_unstarted()
            && self
                .predecessors_of(id)
                .all(|pred| self.satisfied(pred))
    }

    /// Immediate successors of `id` that became dispatchable now that `id`
    /// is SUCCESSFUL. Push-model propagation: called on every successful
    /// completion.
    pub fn newly_ready_after(&self, id: Uuid) -> Vec<Uuid> {
        self.successors_of(id)
            .filter(|succ| self.is_ready(*succ))
            .collect()
    }

    /// Kahn's algorithm; insertion order breaks ties so output is stable
    pub fn topological_order(&self) -> Vec<Uuid> {
        let mut in_degree: HashMap<Uuid, usize> = self
            .order
            .iter()
            .map(|id| (*id, self.predecessors.get(id).map_or(0, HashSet::len)))
            .collect();

        let mut queue: VecDeque<Uuid> = self
            .order
            .iter()
            .filter(|id| in_degree[*id] == 0)
            .copied()
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            sorted.push(id);
            // preserve insertion order among newly freed nodes
            let mut freed: Vec<Uuid> = Vec::new();
            for succ in self.successors_of(id) {
                let degree = in_degree.get_mut(&succ).expect("successor tracked");
                *degree -= 1;
                if *degree == 0 {
                    freed.push(succ);
                }
            }
            freed.sort_by_key(|s| self.order.iter().position(|o| o == s));
            queue.extend(freed);
        }
        sorted
    }

    fn satisfied(&self, id: Uuid) -> bool {
        self.nodes
            .get(&id)
            .map(|n| n.satisfies_dependencies())
            .unwrap_or(false)
    }

    fn has_path(&self, from: Uuid, to: Uuid) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.successors_of(current));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{resource_types, NodeStatus, TaskType};
    use crate::handlers::TaskPayload;

    fn node(task_type: TaskType, resource_type: &str) -> TaskNode {
        TaskNode::new(task_type, resource_type, TaskPayload::Empty)
    }

    #[test]
    fn test_add_next_builds_sequential_chain() {
        let mut graph = TaskGraph::new();
        let a = graph
            .add_next(node(TaskType::Validate, resource_types::NETWORK))
            .unwrap();
        let b = graph
            .add_next(node(TaskType::Create, resource_types::NETWORK))
            .unwrap();
        let c = graph
            .add_next(node(TaskType::Create, resource_types::SUBNET))
            .unwrap();

        assert_eq!(graph.predecessors_of(a).count(), 0);
        assert_eq!(graph.predecessors_of(b).collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.predecessors_of(c).collect::<Vec<_>>(), vec![b]);
        assert_eq!(graph.ready_nodes(), vec![a]);
    }

    #[test]
    fn test_add_previous_rewires_existing_predecessors() {
        let mut graph = TaskGraph::new();
        let a = graph
            .add_next(node(TaskType::Create, resource_types::NETWORK))
            .unwrap();
        let b = graph
            .add_next(node(TaskType::Create, resource_types::SUBNET))
            .unwrap();

        // slot a validation in front of b without touching a's other edges
        let v = graph
            .add_previous(b, node(TaskType::Validate, resource_types::SUBNET))
            .unwrap();

        assert_eq!(graph.predecessors_of(v).collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.predecessors_of(b).collect::<Vec<_>>(), vec![v]);
        assert_eq!(graph.successors_of(a).collect::<Vec<_>>(), vec![v]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = TaskGraph::new();
        let a = graph
            .insert_node(node(TaskType::Create, resource_types::NETWORK))
            .unwrap();
        let b = graph
            .insert_node(node(TaskType::Create, resource_types::SUBNET))
            .unwrap();

        graph.add_edge(a, b).unwrap();
        assert_eq!(
            graph.add_edge(b, a),
            Err(GraphError::CycleDetected { from: b, to: a })
        );
        assert_eq!(
            graph.add_edge(a, a),
            Err(GraphError::CycleDetected { from: a, to: a })
        );
    }

    #[test]
    fn test_readiness_requires_all_predecessors_successful() {
        let mut graph = TaskGraph::new();
        let a = graph
            .insert_node(node(TaskType::Create, resource_types::NETWORK))
            .unwrap();
        let b = graph
            .insert_node(node(TaskType::Create, resource_types::SUBNET))
            .unwrap();
        let c = graph
            .insert_node(node(TaskType::Create, resource_types::LOAD_BALANCER))
            .unwrap();
        graph.add_edge(a, c).unwrap();
        graph.add_edge(b, c).unwrap();

        assert!(!graph.is_ready(c));

        graph.node_mut(a).unwrap().status = Some(NodeStatus::Successful);
        assert!(!graph.is_ready(c), "one predecessor still unfinished");

        graph.node_mut(b).unwrap().status = Some(NodeStatus::Successful);
        assert!(graph.is_ready(c));
        assert_eq!(graph.newly_ready_after(b), vec![c]);
    }

    #[test]
    fn test_failed_predecessor_blocks_forever() {
        let mut graph = TaskGraph::new();
        let a = graph
            .insert_node(node(TaskType::Validate, resource_types::NETWORK))
            .unwrap();
        let b = graph
            .insert_node(node(TaskType::Create, resource_types::NETWORK))
            .unwrap();
        graph.add_edge(a, b).unwrap();

        graph.node_mut(a).unwrap().status = Some(NodeStatus::Failed);
        assert!(!graph.is_ready(b));
        assert!(graph.newly_ready_after(a).is_empty());
    }

    #[test]
    fn test_backfilled_node_satisfies_dependencies() {
        let mut graph = TaskGraph::new();
        let done = graph
            .insert_node(
                node(TaskType::Delete, resource_types::INSTANCE)
                    .with_status(NodeStatus::Successful),
            )
            .unwrap();
        let parent = graph
            .insert_node(node(TaskType::Delete, resource_types::SUBNET))
            .unwrap();
        graph.add_edge(done, parent).unwrap();

        assert_eq!(graph.ready_nodes(), vec![parent]);
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let mut graph = TaskGraph::new();
        let child1 = graph
            .insert_node(node(TaskType::Delete, resource_types::INSTANCE))
            .unwrap();
        let child2 = graph
            .insert_node(node(TaskType::Delete, resource_types::LOAD_BALANCER))
            .unwrap();
        let parent = graph
            .insert_node(node(TaskType::Delete, resource_types::SUBNET))
            .unwrap();
        graph.add_edge(child1, parent).unwrap();
        graph.add_edge(child2, parent).unwrap();

        let order = graph.topological_order();
        assert_eq!(order.len(), 3);
        let pos = |id: Uuid| order.iter().position(|o| *o == id).unwrap();
        assert!(pos(child1) < pos(parent));
        assert!(pos(child2) < pos(parent));
    }
}
