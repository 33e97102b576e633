//! Self-test probe thread support.
//!
//! The installer runs one guarded call on a dedicated thread to prove the
//! interception path works end to end. That thread is flagged here; the
//! tracker treats it as monitored and records a detection instead of
//! calling the configured reporter.

use std::cell::Cell;

thread_local! {
    static PROBE_THREAD: Cell<bool> = const { Cell::new(false) };
    static DETECTIONS: Cell<u32> = const { Cell::new(0) };
}

/// Flags the calling thread as the self-test probe.
pub fn enter_probe_thread() {
    PROBE_THREAD.set(true);
    DETECTIONS.set(0);
}

/// Returns `true` on the probe thread.
pub fn is_probe_thread() -> bool {
    PROBE_THREAD.get()
}

/// Detections recorded on the calling probe thread.
pub fn detections() -> u32 {
    DETECTIONS.get()
}

pub(crate) fn record_detection() {
    DETECTIONS.set(DETECTIONS.get().saturating_add(1));
}
