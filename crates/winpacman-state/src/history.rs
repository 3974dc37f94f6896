//! Bounded operation-history ring buffer (spec §3, §4.8 "history.json").
//!
//! Writes are best-effort: a failure is logged and swallowed rather than
//! surfaced to the caller, so a transient disk hiccup never turns a
//! successful install/uninstall into a reported failure.

use std::path::{Path, PathBuf};

use tracing::warn;
use winpacman_model::{OperationHistoryEntry, HISTORY_CAPACITY};

use crate::atomic::write_json_atomically;

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Vec<OperationHistoryEntry> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|error| {
                warn!(path = ?self.path, %error, "failed to parse history.json, starting empty");
                Vec::new()
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => {
                warn!(path = ?self.path, %error, "failed to read history.json, starting empty");
                Vec::new()
            }
        }
    }

    /// Append `entry`, truncating the stored history to the most recent
    /// [`HISTORY_CAPACITY`] entries.
    pub fn append(&self, entry: OperationHistoryEntry) {
        let mut entries = self.load();
        entries.push(entry);
        if entries.len() > HISTORY_CAPACITY {
            let drop = entries.len() - HISTORY_CAPACITY;
            entries.drain(..drop);
        }

        if let Err(error) = write_json_atomically(&self.path, &entries) {
            warn!(path = ?self.path, %error, "failed to persist history.json");
        }
    }
}
