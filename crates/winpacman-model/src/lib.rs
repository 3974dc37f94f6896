//! Canonical package record model shared across `winpacman`.
//!
//! This crate has no I/O of its own: it defines the normalized shapes
//! (`PackageRecord`, `Manager`, `SyncMetadataRecord`, `OperationHistoryEntry`)
//! that every other crate in the workspace passes around.

mod history;
mod manager;
mod record;
mod sync_meta;
mod version;

pub use history::{OperationHistoryEntry, OperationKind, HISTORY_CAPACITY};
pub use manager::{Manager, ParseManagerError};
pub use record::PackageRecord;
pub use sync_meta::{Freshness, SyncMetadataRecord, SyncStatus};
pub use version::Version;
