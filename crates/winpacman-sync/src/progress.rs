//! Sync progress events (spec §4.5 "Progress").

use std::time::{Duration, Instant};

use winpacman_model::Manager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Starting,
    Fetching,
    Parsing,
    Writing,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SyncProgressEvent {
    pub provider: Manager,
    pub phase: SyncPhase,
    pub current: u64,
    pub total: Option<u64>,
    pub message: Option<String>,
}

impl SyncProgressEvent {
    pub fn new(provider: Manager, phase: SyncPhase, current: u64, total: Option<u64>, message: Option<String>) -> Self {
        Self { provider, phase, current, total, message }
    }

    pub fn starting(provider: Manager) -> Self {
        Self::new(provider, SyncPhase::Starting, 0, None, None)
    }

    pub fn done(provider: Manager, message: impl Into<String>) -> Self {
        Self::new(provider, SyncPhase::Done, 0, None, Some(message.into()))
    }

    pub fn failed(provider: Manager, message: impl Into<String>) -> Self {
        Self::new(provider, SyncPhase::Failed, 0, None, Some(message.into()))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, SyncPhase::Done | SyncPhase::Failed)
    }
}

/// Caps the rate at which non-terminal events are allowed through to
/// roughly 20/s, the ceiling spec §4.5 sets for the GUI subscriber.
/// Terminal events (`done`/`failed`) always pass, since a caller must
/// never miss the end of a stream.
pub struct CoalesceGate {
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl CoalesceGate {
    pub fn new() -> Self {
        Self::with_rate(20)
    }

    pub fn with_rate(events_per_second: u32) -> Self {
        let min_interval = Duration::from_millis(1000 / events_per_second.max(1) as u64);
        Self { min_interval, last_emit: None }
    }

    /// Whether `event` should actually be sent right now.
    pub fn allow(&mut self, event: &SyncProgressEvent) -> bool {
        if event.is_terminal() {
            self.last_emit = Some(Instant::now());
            return true;
        }

        let now = Instant::now();
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}

impl Default for CoalesceGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events_always_pass() {
        let mut gate = CoalesceGate::new();
        assert!(gate.allow(&SyncProgressEvent::done(Manager::Npm, "ok")));
        assert!(gate.allow(&SyncProgressEvent::failed(Manager::Npm, "boom")));
    }

    #[test]
    fn rapid_non_terminal_events_are_throttled() {
        let mut gate = CoalesceGate::with_rate(20);
        let event = SyncProgressEvent::new(Manager::Winget, SyncPhase::Writing, 1, None, None);
        assert!(gate.allow(&event));
        assert!(!gate.allow(&event));
    }
}
