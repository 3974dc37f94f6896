//! Windows "system required" execution state (spec §4.5 "Power
//! management", §5 "scoped to the duration of each `refresh_*` call and
//! restored on every exit path, including panics").
//!
//! No example in the retrieved corpus touches
//! `SetThreadExecutionState`; this is built directly against the
//! `windows-sys` crate the workspace already pins for registry access,
//! following the same acquire/guard-drop-releases shape the teacher
//! uses for other scoped OS resources (e.g. `vx_system_pm`'s process
//! handles).

use std::sync::Mutex;

/// Tracks how many refreshes currently want the execution state held,
/// so overlapping `refresh_all` calls don't let one finishing refresh
/// release the state while another is still running.
pub struct PowerState {
    active: Mutex<u32>,
}

impl PowerState {
    pub fn new() -> Self {
        Self { active: Mutex::new(0) }
    }

    /// Acquire for the lifetime of the returned guard. The underlying
    /// OS call only happens on the 0 -> 1 transition; the matching
    /// release call only happens on the 1 -> 0 transition.
    pub fn acquire(&self) -> PowerGuard<'_> {
        let mut active = self.active.lock().unwrap();
        *active += 1;
        if *active == 1 {
            platform::request_system_required();
        }
        PowerGuard { state: self }
    }
}

impl Default for PowerState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PowerGuard<'a> {
    state: &'a PowerState,
}

impl Drop for PowerGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.state.active.lock().unwrap();
        *active -= 1;
        if *active == 0 {
            platform::release_system_required();
        }
    }
}

#[cfg(windows)]
mod platform {
    use windows_sys::Win32::System::Power::{SetThreadExecutionState, ES_CONTINUOUS, ES_SYSTEM_REQUIRED};

    pub fn request_system_required() {
        // SAFETY: SetThreadExecutionState takes a plain flags value and
        // returns the previous state; it has no preconditions beyond
        // being called from a thread that stays alive for the call.
        unsafe {
            SetThreadExecutionState(ES_CONTINUOUS | ES_SYSTEM_REQUIRED);
        }
    }

    pub fn release_system_required() {
        unsafe {
            SetThreadExecutionState(ES_CONTINUOUS);
        }
    }
}

#[cfg(not(windows))]
mod platform {
    pub fn request_system_required() {}
    pub fn release_system_required() {}
}
