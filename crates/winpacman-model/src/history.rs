use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manager::Manager;

/// The operation an [`OperationHistoryEntry`] records (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Install,
    Uninstall,
}

/// One entry in the bounded operation-history ring buffer (spec §3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationHistoryEntry {
    pub op: OperationKind,
    pub package_id: String,
    pub manager: Manager,
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Maximum number of entries retained in `history.json` (spec §3 "ring
/// buffer (≤100 entries)").
pub const HISTORY_CAPACITY: usize = 100;
