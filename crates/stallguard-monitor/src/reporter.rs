//! # Violation Reporters
//!
//! A reporter is called synchronously on the offending thread, before the
//! blocking operation runs. Whatever it does (panic, log, record) happens
//! inside the guarded call, so a panicking reporter aborts the operation and
//! unwinds through the caller's stack.
//!
//! | Reporter | Behavior |
//! |----------|----------|
//! | [`PanicReporter`] | panics with a [`BlockingOperationError`] (default) |
//! | [`LoggingReporter`] | `tracing::warn!` and continue |
//! | [`IgnoreReporter`] | does nothing |
//! | [`RecordingReporter`] | stores every record (tests, tooling) |
//! | [`FnReporter`] | any `Fn(&ViolationRecord)` |

use crate::error::BlockingOperationError;
use crate::violation::{trim_internal_frames, ViolationRecord};
use parking_lot::Mutex;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::Arc;
use tracing::{error, warn};

/// Receives violations.
pub trait ViolationReporter: Send + Sync {
    /// Handles one violation. Runs on the thread that made the call.
    fn report(&self, record: &ViolationRecord);
}

impl<T: ViolationReporter + ?Sized> ViolationReporter for Arc<T> {
    fn report(&self, record: &ViolationRecord) {
        (**self).report(record);
    }
}

impl<T: ViolationReporter + ?Sized> ViolationReporter for Box<T> {
    fn report(&self, record: &ViolationRecord) {
        (**self).report(record);
    }
}

/// Panics with a [`BlockingOperationError`] payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicReporter {
    force_backtrace: bool,
}

impl PanicReporter {
    /// Creates a reporter that captures a backtrace when `RUST_BACKTRACE`
    /// enables one.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            force_backtrace: false,
        }
    }

    /// Always captures a backtrace, regardless of the environment.
    #[must_use]
    pub const fn with_forced_backtrace(mut self, force: bool) -> Self {
        self.force_backtrace = force;
        self
    }

    fn build_error(&self, record: &ViolationRecord) -> BlockingOperationError {
        let backtrace = if self.force_backtrace {
            Backtrace::force_capture()
        } else {
            Backtrace::capture()
        };
        let err = BlockingOperationError::new(record.clone());
        match backtrace.status() {
            BacktraceStatus::Captured => {
                err.with_backtrace(trim_internal_frames(&backtrace.to_string()))
            }
            _ => err,
        }
    }
}

impl ViolationReporter for PanicReporter {
    fn report(&self, record: &ViolationRecord) {
        let err = self.build_error(record);
        // The default panic hook does not print non-string payloads.
        error!("{}", err);
        std::panic::panic_any(err);
    }
}

/// Logs violations at `warn` and lets the call proceed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter;

impl ViolationReporter for LoggingReporter {
    fn report(&self, record: &ViolationRecord) {
        warn!(
            owner = %record.owner,
            name = %record.name,
            thread = ?std::thread::current().name(),
            "Blocking call! {}",
            record
        );
    }
}

/// Drops violations.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreReporter;

impl ViolationReporter for IgnoreReporter {
    fn report(&self, _record: &ViolationRecord) {}
}

/// Collects every violation in memory.
///
/// Share it through an `Arc` to inspect records after the fact:
///
/// ```rust
/// use std::sync::Arc;
/// use stallguard_monitor::{RecordingReporter, ViolationRecord, ViolationReporter};
///
/// let recorder = Arc::new(RecordingReporter::new());
/// let reporter: Arc<dyn ViolationReporter> = recorder.clone();
/// reporter.report(&ViolationRecord::new("std::fs", "read", true));
/// assert_eq!(recorder.count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingReporter {
    records: Mutex<Vec<ViolationRecord>>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the records collected so far.
    pub fn records(&self) -> Vec<ViolationRecord> {
        self.records.lock().clone()
    }

    /// Number of records collected so far.
    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    /// Removes and returns all records.
    pub fn take(&self) -> Vec<ViolationRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl ViolationReporter for RecordingReporter {
    fn report(&self, record: &ViolationRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Adapts a closure into a reporter.
pub struct FnReporter<F>(F);

impl<F> FnReporter<F>
where
    F: Fn(&ViolationRecord) + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ViolationReporter for FnReporter<F>
where
    F: Fn(&ViolationRecord) + Send + Sync,
{
    fn report(&self, record: &ViolationRecord) {
        (self.0)(record);
    }
}

/// Shorthand for [`FnReporter::new`].
pub fn reporter_fn<F>(f: F) -> FnReporter<F>
where
    F: Fn(&ViolationRecord) + Send + Sync,
{
    FnReporter::new(f)
}
