//! # Stratus Core
//!
//! Control-plane orchestration core for cloud resource provisioning. Every
//! provisioning operation is a **root** owning a DAG of **task nodes**;
//! dependency edges gate dispatch, handlers drive provider calls through a
//! two-phase action/wait lifecycle, and aggregate statuses roll up from nodes
//! to roots to workspaces.
//!
//! ## Architecture
//!
//! - [`graph`] — in-memory task DAG, readiness rules, aggregate status
//!   derivation
//! - [`store`] — persistence boundary ([`store::PgStore`] for Postgres,
//!   [`store::MemoryStore`] for tests and embedded use)
//! - [`lifecycle`] — provider client boundary, two-phase action/wait
//!   execution, bounded retry
//! - [`registry`] — `(task_type, resource_type)` handler bindings
//! - [`orchestration`] — viable node discovery, step execution, result
//!   propagation, the cascading deletion builder, workspace bulk operations,
//!   and the deletion sweeper
//!
//! ## Example
//!
//! ```
//! use stratus_core::constants::{resource_types, TaskType, WorkflowNature};
//! use stratus_core::graph::TaskGraph;
//! use stratus_core::handlers::TaskPayload;
//! use stratus_core::models::{Root, TaskNode};
//!
//! let mut graph = TaskGraph::new();
//! let validate = graph
//!     .add_next(TaskNode::new(
//!         TaskType::Validate,
//!         resource_types::NETWORK,
//!         TaskPayload::Empty,
//!     ))
//!     .unwrap();
//! graph
//!     .add_next(TaskNode::new(
//!         TaskType::Create,
//!         resource_types::NETWORK,
//!         TaskPayload::Empty,
//!     ))
//!     .unwrap();
//!
//! // only the validation is dispatchable until it succeeds
//! assert_eq!(graph.ready_nodes(), vec![validate]);
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod graph;
pub mod handlers;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;
pub mod store;

pub use config::EngineConfig;
pub use constants::{NodeStatus, RootStatus, TaskType, WorkflowNature, WorkspaceStatus};
pub use error::{GraphError, ProviderError, Result, StratusError};
pub use events::EventPublisher;
pub use graph::TaskGraph;
pub use models::{CloudAccount, Root, TaskNode, Workspace};
pub use registry::{HandlerKey, HandlerRegistry};
pub use store::{MemoryStore, PgStore, Store};
