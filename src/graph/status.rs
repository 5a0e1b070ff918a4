//! Aggregate status derivation.
//!
//! Root and workspace statuses are pure functions of their members' statuses
//! plus the current parked state, invoked after every transition. Keeping the
//! derivation in one place is what lets every read site agree on aggregate
//! status.

use crate::constants::{NodeStatus, RootStatus, WorkspaceStatus};

/// Derive a root's aggregate status from its nodes.
///
/// - COMPLETED_WITH_FAILURE as soon as any node is FAILED; running siblings
///   are left to finish or stall, never cancelled
/// - COMPLETED_SUCCESSFULLY when every node is SUCCESSFUL
/// - RUNNING while the operation is underway (any node has started but the
///   graph is not terminal)
/// - the caller-driven park state (`current`) is preserved until any node
///   starts
pub fn derive_root_status<I>(current: RootStatus, node_statuses: I) -> RootStatus
where
    I: IntoIterator<Item = Option<NodeStatus>>,
{
    let mut total = 0usize;
    let mut successful = 0usize;
    let mut any_failed = false;
    let mut any_started = false;

    for status in node_statuses {
        total += 1;
        match status {
            Some(NodeStatus::Failed) => {
                any_failed = true;
                any_started = true;
            }
            Some(NodeStatus::Successful) => {
                successful += 1;
                any_started = true;
            }
            Some(NodeStatus::Running) | Some(NodeStatus::RunningWait) => {
                any_started = true;
            }
            None => {}
        }
    }

    if any_failed {
        return RootStatus::CompletedWithFailure;
    }
    if total > 0 && successful == total {
        return RootStatus::CompletedSuccessfully;
    }
    if any_started {
        return RootStatus::Running;
    }
    current
}

/// Derive a workspace's aggregate status from its member roots.
pub fn derive_workspace_status<I>(current: WorkspaceStatus, root_statuses: I) -> WorkspaceStatus
where
    I: IntoIterator<Item = RootStatus>,
{
    let mut total = 0usize;
    let mut succeeded = 0usize;
    let mut any_failed = false;
    let mut any_running = false;

    for status in root_statuses {
        total += 1;
        match status {
            RootStatus::Running => any_running = true,
            RootStatus::CompletedWithFailure => any_failed = true,
            RootStatus::CompletedSuccessfully => succeeded += 1,
            _ => {}
        }
    }

    if any_running {
        return WorkspaceStatus::Running;
    }
    if any_failed {
        return WorkspaceStatus::CompletedWithFailure;
    }
    if total > 0 && succeeded == total {
        return WorkspaceStatus::CompletedSuccessfully;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parked_state_preserved_until_first_transition() {
        let nodes = vec![None, None, None];
        assert_eq!(
            derive_root_status(RootStatus::OnHold, nodes.clone()),
            RootStatus::OnHold
        );
        assert_eq!(
            derive_root_status(RootStatus::Ready, nodes),
            RootStatus::Ready
        );
    }

    #[test]
    fn test_running_while_any_node_active() {
        let nodes = vec![Some(NodeStatus::Successful), Some(NodeStatus::RunningWait)];
        assert_eq!(
            derive_root_status(RootStatus::Ready, nodes),
            RootStatus::Running
        );
    }

    #[test]
    fn test_failure_wins_over_running_siblings() {
        let nodes = vec![
            Some(NodeStatus::Failed),
            Some(NodeStatus::Running),
            Some(NodeStatus::Successful),
        ];
        assert_eq!(
            derive_root_status(RootStatus::Running, nodes),
            RootStatus::CompletedWithFailure
        );
    }

    #[test]
    fn test_all_successful_completes() {
        let nodes = vec![Some(NodeStatus::Successful); 4];
        assert_eq!(
            derive_root_status(RootStatus::Running, nodes),
            RootStatus::CompletedSuccessfully
        );
    }

    #[test]
    fn test_workspace_aggregation() {
        assert_eq!(
            derive_workspace_status(
                WorkspaceStatus::Pending,
                vec![RootStatus::Running, RootStatus::CompletedWithFailure]
            ),
            WorkspaceStatus::Running
        );
        assert_eq!(
            derive_workspace_status(
                WorkspaceStatus::Pending,
                vec![
                    RootStatus::CompletedSuccessfully,
                    RootStatus::CompletedWithFailure
                ]
            ),
            WorkspaceStatus::CompletedWithFailure
        );
        assert_eq!(
            derive_workspace_status(
                WorkspaceStatus::Pending,
                vec![RootStatus::OnHold, RootStatus::CompletedSuccessfully]
            ),
            WorkspaceStatus::Pending
        );
    }

    fn node_status_strategy() -> impl Strategy<Value = Option<NodeStatus>> {
        prop_oneof![
            Just(None),
            Just(Some(NodeStatus::Running)),
            Just(Some(NodeStatus::RunningWait)),
            Just(Some(NodeStatus::Successful)),
            Just(Some(NodeStatus::Failed)),
        ]
    }

    proptest! {
        /// COMPLETED_WITH_FAILURE iff at least one node FAILED;
        /// COMPLETED_SUCCESSFULLY iff all nodes SUCCESSFUL
        #[test]
        fn prop_aggregate_status_matches_definition(
            statuses in prop::collection::vec(node_status_strategy(), 1..20)
        ) {
            let derived = derive_root_status(RootStatus::Ready, statuses.clone());
            let any_failed = statuses.iter().any(|s| *s == Some(NodeStatus::Failed));
            let all_successful = statuses.iter().all(|s| *s == Some(NodeStatus::Successful));

            prop_assert_eq!(derived == RootStatus::CompletedWithFailure, any_failed);
            prop_assert_eq!(derived == RootStatus::CompletedSuccessfully, !any_failed && all_successful);
        }
    }
}
