//! # System Constants
//!
//! Core enums and status groupings that define the operational boundaries of
//! the provisioning engine: task node statuses, root aggregate statuses,
//! workspace statuses, and the closed set of task types that step handlers
//! can be bound to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle event names published on state transitions and orchestration actions
pub mod events {
    pub const NODE_DISPATCHED: &str = "node.dispatched";
    pub const NODE_COMPLETED: &str = "node.completed";
    pub const NODE_FAILED: &str = "node.failed";
    pub const NODE_WAITING: &str = "node.waiting";

    pub const ROOT_STARTED: &str = "root.started";
    pub const ROOT_COMPLETED: &str = "root.completed";
    pub const ROOT_FAILED: &str = "root.failed";

    pub const WORKSPACE_PROVISION_REQUESTED: &str = "workspace.provision_requested";
    pub const WORKSPACE_DELETED: &str = "workspace.deleted";

    pub const VIABLE_NODES_DISCOVERED: &str = "workflow.viable_nodes_discovered";
    pub const NO_VIABLE_NODES: &str = "workflow.no_viable_nodes";

    pub const DELETION_SWEEP_STARTED: &str = "sweep.deletion_started";
    pub const DELETION_SWEEP_SKIPPED: &str = "sweep.deletion_skipped";
}

/// Well-known resource type tags used by handler bindings and the deletion
/// graph builder. Attach/detach bindings use composite `"{child}-{parent}"`
/// tags built with [`attachment_resource_type`].
pub mod resource_types {
    pub const NETWORK: &str = "network";
    pub const SUBNET: &str = "subnet";
    pub const INSTANCE: &str = "instance";
    pub const LOAD_BALANCER: &str = "load_balancer";
    pub const CLUSTER: &str = "cluster";
    pub const VPN_GATEWAY: &str = "vpn_gateway";
    pub const PUBLIC_GATEWAY: &str = "public_gateway";
    pub const BUCKET: &str = "bucket";
}

/// Composite resource tag for attach/detach bindings between two resource kinds
pub fn attachment_resource_type(child: &str, parent: &str) -> String {
    format!("{child}-{parent}")
}

/// The closed set of operations a task node can perform. Extensible only by
/// adding new handler bindings, never by widening this enum at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Create,
    Delete,
    Update,
    Validate,
    Sync,
    Attach,
    Detach,
    Restore,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Validate => "validate",
            Self::Sync => "sync",
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::Restore => "restore",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "update" => Ok(Self::Update),
            "validate" => Ok(Self::Validate),
            "sync" => Ok(Self::Sync),
            "attach" => Ok(Self::Attach),
            "detach" => Ok(Self::Detach),
            "restore" => Ok(Self::Restore),
            _ => Err(format!("Invalid task type: {s}")),
        }
    }
}

/// Task node status. A node that has never been dispatched carries no status
/// at all (`Option<NodeStatus>` is `None` on the record), so this enum holds
/// only the states a handler can commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Handler is executing the action phase
    Running,
    /// Action issued, provider still converging; re-enterable on every re-dispatch
    RunningWait,
    /// Terminal success
    Successful,
    /// Terminal failure
    Failed,
}

impl NodeStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Successful | Self::Failed)
    }

    /// Check if this status satisfies dependencies for successor nodes
    pub fn satisfies_dependencies(&self) -> bool {
        status_groups::DEPENDENCY_SATISFYING_STATUSES.contains(self)
    }

    /// Check if this is an active state (node is being processed)
    pub fn is_active(&self) -> bool {
        status_groups::ACTIVE_NODE_STATUSES.contains(self)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::RunningWait => "running_wait",
            Self::Successful => "successful",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "running_wait" => Ok(Self::RunningWait),
            "successful" => Ok(Self::Successful),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid node status: {s}")),
        }
    }
}

/// Root aggregate status, derived from member node statuses plus the
/// caller-driven park states (READY/ON_HOLD/PENDING).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootStatus {
    /// Created, no node has started yet
    Initiated,
    /// Queued by a workspace provisioning action
    Pending,
    /// Explicitly released to run
    Ready,
    /// Withheld pending an external trigger
    OnHold,
    /// At least one node is running or waiting
    Running,
    /// Every node finished successfully
    CompletedSuccessfully,
    /// At least one node failed; surviving branches are left to finish
    CompletedWithFailure,
}

impl RootStatus {
    /// Check if this is a final state
    pub fn is_final(&self) -> bool {
        status_groups::ROOT_FINAL_STATUSES.contains(self)
    }

    /// Check if this is a caller-driven park state preserved until the first
    /// node transition
    pub fn is_parked(&self) -> bool {
        matches!(
            self,
            Self::Initiated | Self::Pending | Self::Ready | Self::OnHold
        )
    }
}

impl fmt::Display for RootStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initiated => "initiated",
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::OnHold => "on_hold",
            Self::Running => "running",
            Self::CompletedSuccessfully => "completed_successfully",
            Self::CompletedWithFailure => "completed_with_failure",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RootStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "on_hold" => Ok(Self::OnHold),
            "running" => Ok(Self::Running),
            "completed_successfully" => Ok(Self::CompletedSuccessfully),
            "completed_with_failure" => Ok(Self::CompletedWithFailure),
            _ => Err(format!("Invalid root status: {s}")),
        }
    }
}

/// Workspace aggregate status over member roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    /// Created, provisioning not yet requested
    Created,
    /// Provisioning requested, members released to the dispatcher
    Pending,
    /// At least one member root is running
    Running,
    /// Every member root completed successfully
    CompletedSuccessfully,
    /// At least one member root completed with failure
    CompletedWithFailure,
}

impl WorkspaceStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::CompletedSuccessfully | Self::CompletedWithFailure)
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::CompletedSuccessfully => "completed_successfully",
            Self::CompletedWithFailure => "completed_with_failure",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for WorkspaceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed_successfully" => Ok(Self::CompletedSuccessfully),
            "completed_with_failure" => Ok(Self::CompletedWithFailure),
            _ => Err(format!("Invalid workspace status: {s}")),
        }
    }
}

/// Free-form classification of what a root does. Display-only; execution
/// logic never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowNature {
    Create,
    Delete,
    Sync,
    Restore,
    Translation,
    Attach,
    Detach,
    Update,
}

impl fmt::Display for WorkflowNature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Sync => "sync",
            Self::Restore => "restore",
            Self::Translation => "translation",
            Self::Attach => "attach",
            Self::Detach => "detach",
            Self::Update => "update",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for WorkflowNature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "sync" => Ok(Self::Sync),
            "restore" => Ok(Self::Restore),
            "translation" => Ok(Self::Translation),
            "attach" => Ok(Self::Attach),
            "detach" => Ok(Self::Detach),
            "update" => Ok(Self::Update),
            _ => Err(format!("Invalid workflow nature: {s}")),
        }
    }
}

/// Status groupings for validation and aggregate logic
pub mod status_groups {
    use super::{NodeStatus, RootStatus};

    /// Node statuses that satisfy successor dependencies
    pub const DEPENDENCY_SATISFYING_STATUSES: &[NodeStatus] = &[NodeStatus::Successful];

    /// Node statuses that indicate active work
    pub const ACTIVE_NODE_STATUSES: &[NodeStatus] =
        &[NodeStatus::Running, NodeStatus::RunningWait];

    /// Root statuses that indicate final completion
    pub const ROOT_FINAL_STATUSES: &[RootStatus] = &[
        RootStatus::CompletedSuccessfully,
        RootStatus::CompletedWithFailure,
    ];

    /// Root statuses skipped by selective re-provisioning
    pub const ROOT_SKIP_REPROVISION_STATUSES: &[RootStatus] =
        &[RootStatus::Running, RootStatus::CompletedSuccessfully];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_status_terminal_check() {
        assert!(NodeStatus::Successful.is_terminal());
        assert!(NodeStatus::Failed.is_terminal());
        assert!(!NodeStatus::Running.is_terminal());
        assert!(!NodeStatus::RunningWait.is_terminal());
    }

    #[test]
    fn test_node_status_dependency_satisfaction() {
        assert!(NodeStatus::Successful.satisfies_dependencies());
        assert!(!NodeStatus::Failed.satisfies_dependencies());
        assert!(!NodeStatus::Running.satisfies_dependencies());
        assert!(!NodeStatus::RunningWait.satisfies_dependencies());
    }

    #[test]
    fn test_status_string_conversion() {
        assert_eq!(NodeStatus::RunningWait.to_string(), "running_wait");
        assert_eq!(
            "running_wait".parse::<NodeStatus>().unwrap(),
            NodeStatus::RunningWait
        );

        assert_eq!(
            RootStatus::CompletedWithFailure.to_string(),
            "completed_with_failure"
        );
        assert_eq!("on_hold".parse::<RootStatus>().unwrap(), RootStatus::OnHold);
    }

    #[test]
    fn test_status_serde() {
        let status = NodeStatus::RunningWait;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"running_wait\"");

        let parsed: NodeStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }

    #[test]
    fn test_attachment_resource_type() {
        assert_eq!(
            attachment_resource_type(resource_types::PUBLIC_GATEWAY, resource_types::SUBNET),
            "public_gateway-subnet"
        );
    }

    #[test]
    fn test_root_parked_states() {
        assert!(RootStatus::OnHold.is_parked());
        assert!(RootStatus::Ready.is_parked());
        assert!(!RootStatus::Running.is_parked());
        assert!(!RootStatus::CompletedWithFailure.is_parked());
    }
}
