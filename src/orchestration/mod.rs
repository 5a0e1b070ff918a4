//! # Orchestration Core
//!
//! Dispatch-side components: discovery of dispatchable nodes, step
//! execution, result propagation, the cascading deletion builder, workspace
//! bulk operations, and the background deletion sweeper.

pub mod deletion_graph;
pub mod error_classifier;
pub mod named_lock;
pub mod result_processor;
pub mod step_executor;
pub mod sweeper;
pub mod viable_node_discovery;
pub mod workspace_ops;

pub use deletion_graph::{
    build_and_commit, build_deletion_graph, GatewayAttachment, NetworkTopology, ResourceRef,
    SubnetTopology,
};
pub use error_classifier::{classify_failure, display_message};
pub use named_lock::{NamedLease, NamedLockRegistry};
pub use result_processor::{Enqueuer, ResultProcessor};
pub use step_executor::StepExecutor;
pub use sweeper::{DeletionPlanner, DeletionSweeper, SWEEP_LOCK_NAME};
pub use viable_node_discovery::ViableNodeDiscovery;
pub use workspace_ops::{RootSeed, WorkspaceOps};
