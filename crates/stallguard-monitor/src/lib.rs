//! # Stallguard Monitor
//!
//! Runtime half of blocking-call detection: decides whether the calling
//! thread is supposed to be non-blocking, tracks nested allow/disallow
//! scopes, and reports violations.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`ThreadClassifier`] | Cached and dynamic "is this thread monitored" predicates |
//! | [`ScopeTracker`] | Per-thread state machine run by every guarded call |
//! | [`ScopeGuard`] | RAII restore of the enclosing allowance |
//! | [`ViolationReporter`] | What happens when a violation is found |
//!
//! ## Architecture
//!
//! ```text
//! guarded call ──▶ ScopeTracker::check(owner, name, is_static)
//!                      │
//!                      ├─▶ thread-local slot (state, allowed)
//!                      ├─▶ ThreadClassifier (first use, or every call if dynamic)
//!                      └─▶ ViolationReporter (monitored and not allowed)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use stallguard_monitor::{RecordingReporter, ScopeTracker, ThreadClassifier, ThreadPredicate};
//!
//! let mut classifier = ThreadClassifier::new();
//! classifier.or_non_blocking(ThreadPredicate::always());
//!
//! let recorder = Arc::new(RecordingReporter::new());
//! let tracker = ScopeTracker::new(classifier, recorder.clone());
//!
//! tracker.check("std::thread", "sleep", true);
//! {
//!     let _allowed = tracker.enter_scope(true);
//!     tracker.check("std::thread", "sleep", true);
//! }
//! assert_eq!(recorder.count(), 1);
//! ```
//!
//! ## Notes
//!
//! - Checks run on the calling thread and never take a lock
//! - The hot path performs no logging
//! - A non-dynamic verdict is computed once per thread and never revisited

mod classifier;
mod error;
pub mod probe;
mod reporter;
mod tracker;
mod violation;

pub use classifier::{
    clear_current_thread_mark, is_marked_non_blocking, mark_current_thread_non_blocking,
    ThreadClassifier, ThreadPredicate,
};
pub use error::BlockingOperationError;
pub use reporter::{
    reporter_fn, FnReporter, IgnoreReporter, LoggingReporter, PanicReporter, RecordingReporter,
    ViolationReporter,
};
pub use tracker::{ScopeGuard, ScopeTracker, ThreadState};
pub use violation::{trim_internal_frames, ViolationRecord};
