//! Event types the façade's streams carry (spec §4.9 "Streams carry
//! typed events (progress or final result)").

use winpacman_engine::{OperationProgressEvent, OperationResult};
use winpacman_sync::SyncPhase;

/// One step of a `refresh_installed()` stream: registry + Scoop scan,
/// resolver attribution, cache merge (spec §4.9 `refresh_installed`).
/// Reuses `winpacman-sync`'s phase vocabulary since the shape of "a
/// scan that starts, makes progress, and finishes or fails" is the same
/// one catalog syncs already use.
#[derive(Debug, Clone)]
pub struct InstalledScanEvent {
    pub phase: SyncPhase,
    pub message: Option<String>,
}

impl InstalledScanEvent {
    pub fn new(phase: SyncPhase, message: impl Into<Option<String>>) -> Self {
        Self { phase, message: message.into() }
    }
}

/// One event from an `install`/`uninstall` stream: either a progress
/// tick forwarded from the engine, or the terminal result (spec §4.9
/// "the GUI subscribes and may cancel").
#[derive(Debug, Clone)]
pub enum OperationStreamEvent {
    Progress(OperationProgressEvent),
    Finished(Result<OperationResult, OperationStreamError>),
}

/// A façade-friendly, clonable projection of `winpacman_engine::
/// EngineError` — the original borrows nothing un-clonable, but its
/// `OperationResult` payloads are large, so the stream only carries a
/// rendered message plus whatever partial output survived.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OperationStreamError {
    #[error("{package_id} has no attributed manager; resolve it first")]
    UnattributedPackage { package_id: String },

    #[error("{message}")]
    ManagerUnavailable { message: String },

    #[error("timed out")]
    Timeout { partial: OperationResult },

    #[error("cancelled")]
    Cancelled { partial: OperationResult },
}

impl From<winpacman_engine::EngineError> for OperationStreamError {
    fn from(error: winpacman_engine::EngineError) -> Self {
        use winpacman_engine::EngineError;
        match error {
            EngineError::UnattributedPackage { package_id } => Self::UnattributedPackage { package_id },
            EngineError::ManagerUnavailable { message, .. } => Self::ManagerUnavailable { message },
            EngineError::Timeout { partial, .. } => Self::Timeout { partial },
            EngineError::Cancelled { partial, .. } => Self::Cancelled { partial },
        }
    }
}
