//! Cloud account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Credentials-owning account entity at the provider boundary.
///
/// Marked invalid when the provider rejects authentication so future
/// operations short-circuit; marked for deletion by upstream policy and
/// picked up by the deletion sweeper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudAccount {
    pub id: Uuid,
    pub name: String,
    pub valid: bool,
    pub marked_for_deletion: bool,
    pub created_at: DateTime<Utc>,
}

impl CloudAccount {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            valid: true,
            marked_for_deletion: false,
            created_at: Utc::now(),
        }
    }
}
