//! Named exclusive locks.
//!
//! Process-wide mutual exclusion for background jobs that must not run
//! concurrently with themselves (the deletion sweeper, account syncs). A
//! lease is held until dropped or until its TTL elapses, so a crashed holder
//! never wedges the name forever.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

struct Lease {
    token: u64,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct NamedLockRegistry {
    held: Mutex<HashMap<String, Lease>>,
    next_token: Mutex<u64>,
}

impl NamedLockRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Try to take the named lock for `ttl_secs`. Returns `None` when another
    /// live lease holds the name; an expired lease is reclaimed.
    pub fn acquire(self: &Arc<Self>, name: &str, ttl_secs: i64) -> Option<NamedLease> {
        let now = Utc::now();
        let mut held = self.held.lock();

        if let Some(lease) = held.get(name) {
            if lease.expires_at > now {
                debug!(name, "lock held by a live lease");
                return None;
            }
            debug!(name, "reclaiming expired lease");
        }

        let token = {
            let mut next = self.next_token.lock();
            *next += 1;
            *next
        };
        held.insert(
            name.to_string(),
            Lease {
                token,
                expires_at: now + Duration::seconds(ttl_secs),
            },
        );
        Some(NamedLease {
            registry: Arc::clone(self),
            name: name.to_string(),
            token,
        })
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.held
            .lock()
            .get(name)
            .map(|lease| lease.expires_at > Utc::now())
            .unwrap_or(false)
    }

    /// Release by token, so dropping a stale lease cannot free a name that
    /// was reclaimed by a newer holder in the meantime.
    fn release(&self, name: &str, token: u64) {
        let mut held = self.held.lock();
        if held.get(name).map(|lease| lease.token) == Some(token) {
            held.remove(name);
        }
    }
}

/// RAII lease over one lock name.
pub struct NamedLease {
    registry: Arc<NamedLockRegistry>,
    name: String,
    token: u64,
}

impl NamedLease {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedLease {
    fn drop(&mut self) {
        self.registry.release(&self.name, self.token);
    }
}
