//! Deletion sweeper.
//!
//! Periodic background pass over cloud accounts marked for deletion: for each
//! one, plan the network topologies still present and commit a cascading
//! deletion root per network. Runs under a named exclusive lock so
//! overlapping sweeps never double-commit deletion graphs.

use crate::constants::events;
use crate::error::Result;
use crate::events::EventPublisher;
use crate::models::CloudAccount;
use crate::orchestration::deletion_graph::{build_and_commit, NetworkTopology};
use crate::orchestration::named_lock::NamedLockRegistry;
use crate::store::Store;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

pub const SWEEP_LOCK_NAME: &str = "cloud_deletion_sweep";

/// Supplies the network topologies that still exist for an account. Backed by
/// provider inventory queries outside the core.
#[async_trait::async_trait]
pub trait DeletionPlanner: Send + Sync {
    async fn plan(&self, account: &CloudAccount) -> Result<Vec<NetworkTopology>>;
}

pub struct DeletionSweeper {
    store: Arc<dyn Store>,
    planner: Arc<dyn DeletionPlanner>,
    locks: Arc<NamedLockRegistry>,
    publisher: EventPublisher,
    lock_ttl_secs: i64,
}

impl DeletionSweeper {
    pub fn new(
        store: Arc<dyn Store>,
        planner: Arc<dyn DeletionPlanner>,
        locks: Arc<NamedLockRegistry>,
        publisher: EventPublisher,
        lock_ttl_secs: i64,
    ) -> Self {
        Self {
            store,
            planner,
            locks,
            publisher,
            lock_ttl_secs,
        }
    }

    /// One sweep pass. Returns the number of deletion roots committed, or
    /// `None` when another sweep already holds the lock.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<Option<usize>> {
        let Some(_lease) = self.locks.acquire(SWEEP_LOCK_NAME, self.lock_ttl_secs) else {
            self.publisher
                .publish(events::DELETION_SWEEP_SKIPPED, json!({}));
            return Ok(None);
        };

        let accounts = self.store.accounts_marked_for_deletion().await?;
        self.publisher.publish(
            events::DELETION_SWEEP_STARTED,
            json!({ "accounts": accounts.len() }),
        );

        let mut committed = 0usize;
        for account in &accounts {
            let topologies = match self.planner.plan(account).await {
                Ok(topologies) => topologies,
                Err(err) => {
                    // one unreachable account must not stall the whole sweep
                    error!(account_id = %account.id, error = %err, "planning failed, skipping account");
                    continue;
                }
            };

            for topology in &topologies {
                match build_and_commit(self.store.as_ref(), topology).await {
                    Ok(root) => {
                        info!(account_id = %account.id, root_id = %root.id, "deletion root committed");
                        committed += 1;
                    }
                    Err(err) => {
                        warn!(
                            account_id = %account.id,
                            network = %topology.network.provider_id,
                            error = %err,
                            "deletion graph rejected, will retry next sweep"
                        );
                    }
                }
            }
        }
        Ok(Some(committed))
    }

    /// Run sweeps forever at the configured interval.
    pub async fn run(&self, interval_secs: u64) {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                error!(error = %err, "sweep pass failed");
            }
        }
    }
}
