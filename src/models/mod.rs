//! Persisted records: roots, task nodes, workspaces, cloud accounts, and the
//! serialized read model.

pub mod cloud_account;
pub mod root;
pub mod task_node;
pub mod views;
pub mod workspace;

pub use cloud_account::CloudAccount;
pub use root::Root;
pub use task_node::TaskNode;
pub use views::{RootView, TaskNodeView};
pub use workspace::Workspace;
