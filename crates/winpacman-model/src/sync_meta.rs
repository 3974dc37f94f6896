use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manager::Manager;

/// Outcome of a single provider sync (spec §3 "Sync-metadata record").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Partial,
    Failed,
}

/// One row per provider, used to compute cache freshness (spec §3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMetadataRecord {
    pub provider: Manager,
    pub last_sync_started_at: DateTime<Utc>,
    pub last_sync_finished_at: Option<DateTime<Utc>>,
    pub last_sync_status: SyncStatus,
    pub package_count: u64,
    pub error_message: Option<String>,
}

/// Whether a provider's cache slice is within its configured max age
/// (spec §3 "Freshness").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freshness {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub package_count: u64,
    pub status: Option<SyncStatus>,
}

impl Freshness {
    pub fn is_stale(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        match self.last_sync_at {
            None => true,
            Some(last) => now.signed_duration_since(last) > max_age,
        }
    }
}
