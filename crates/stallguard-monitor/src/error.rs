//! Error types for the monitor.
//!
//! The only error the monitor raises is the violation itself, delivered as a
//! panic payload by [`crate::PanicReporter`].

use crate::violation::ViolationRecord;
use thiserror::Error;

/// Raised when a blocking operation runs on a monitored thread.
///
/// The default reporter panics with this value as the payload. It can be
/// recovered with [`std::panic::catch_unwind`]:
///
/// ```rust
/// use stallguard_monitor::{BlockingOperationError, PanicReporter, ViolationRecord, ViolationReporter};
///
/// let caught = std::panic::catch_unwind(|| {
///     PanicReporter::new().report(&ViolationRecord::new("std::thread", "sleep", true));
/// })
/// .unwrap_err();
///
/// let err = caught.downcast_ref::<BlockingOperationError>().unwrap();
/// assert_eq!(err.to_string(), "Blocking call! std::thread::sleep");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Blocking call! {record}")]
pub struct BlockingOperationError {
    record: ViolationRecord,
    backtrace: Option<String>,
}

impl BlockingOperationError {
    /// Creates an error without a backtrace.
    pub fn new(record: ViolationRecord) -> Self {
        Self {
            record,
            backtrace: None,
        }
    }

    /// Attaches a rendered backtrace.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: String) -> Self {
        self.backtrace = Some(backtrace);
        self
    }

    /// The offending call.
    pub fn record(&self) -> &ViolationRecord {
        &self.record
    }

    /// The trimmed backtrace, when one was captured.
    ///
    /// Its first frame is the guarded operation.
    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }
}
