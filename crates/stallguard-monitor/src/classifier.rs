//! # Thread Classifier
//!
//! Decides which threads are supposed to be non-blocking.
//!
//! Two predicates are kept, both starting from `false` and grown by OR:
//!
//! | Predicate | Evaluated | Meaning |
//! |-----------|-----------|---------|
//! | non-blocking | once per thread (cached by the tracker) | thread is monitored |
//! | dynamic | once per thread | re-run the non-blocking predicate on every check |
//!
//! A thread for which the dynamic predicate is true never has its
//! monitored verdict cached, so a predicate reading mutable state (a flag,
//! a thread-local) sees every change.
//!
//! ## Example
//!
//! ```rust
//! use stallguard_monitor::{ThreadClassifier, ThreadPredicate};
//!
//! let mut classifier = ThreadClassifier::new();
//! classifier
//!     .or_non_blocking(ThreadPredicate::name_prefix("reactor-"))
//!     .extend_non_blocking(|current| current.or(ThreadPredicate::named("event-loop")));
//!
//! let handle = std::thread::Builder::new()
//!     .name("reactor-1".into())
//!     .spawn(move || classifier.is_monitored(&std::thread::current()))
//!     .unwrap();
//! assert!(handle.join().unwrap());
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::thread::Thread;
use tracing::debug;

thread_local! {
    static NON_BLOCKING_MARK: Cell<bool> = const { Cell::new(false) };
}

/// Marks the calling thread as non-blocking.
///
/// Threads carrying the mark match [`ThreadPredicate::marked_non_blocking`].
/// Set the mark before the thread's first guarded call: the monitored
/// verdict of a non-dynamic thread is cached on first use.
pub fn mark_current_thread_non_blocking() {
    NON_BLOCKING_MARK.set(true);
}

/// Removes the non-blocking mark from the calling thread.
pub fn clear_current_thread_mark() {
    NON_BLOCKING_MARK.set(false);
}

/// Returns `true` if the calling thread carries the non-blocking mark.
pub fn is_marked_non_blocking() -> bool {
    NON_BLOCKING_MARK.get()
}

type PredicateFn = dyn Fn(&Thread) -> bool + Send + Sync;

/// A shareable thread predicate.
#[derive(Clone)]
pub struct ThreadPredicate(Arc<PredicateFn>);

impl ThreadPredicate {
    /// Wraps a closure.
    pub fn new(f: impl Fn(&Thread) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Always `false`.
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Always `true`.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Matches threads with exactly this name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |thread| thread.name() == Some(name.as_str()))
    }

    /// Matches threads whose name starts with `prefix`.
    pub fn name_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(move |thread| {
            thread
                .name()
                .is_some_and(|name| name.starts_with(prefix.as_str()))
        })
    }

    /// Matches the calling thread when it carries the non-blocking mark.
    ///
    /// The thread argument is ignored: the mark is thread-local and checks
    /// always run on the thread being classified.
    pub fn marked_non_blocking() -> Self {
        Self::new(|_| is_marked_non_blocking())
    }

    /// Logical OR with another predicate.
    #[must_use]
    pub fn or(self, other: ThreadPredicate) -> Self {
        Self::new(move |thread| self.test(thread) || other.test(thread))
    }

    /// Evaluates the predicate.
    pub fn test(&self, thread: &Thread) -> bool {
        (self.0)(thread)
    }
}

impl Default for ThreadPredicate {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for ThreadPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ThreadPredicate(..)")
    }
}

impl<F> From<F> for ThreadPredicate
where
    F: Fn(&Thread) -> bool + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

/// The pair of predicates deciding whether a thread is monitored.
#[derive(Debug, Clone, Default)]
pub struct ThreadClassifier {
    non_blocking: ThreadPredicate,
    dynamic: ThreadPredicate,
}

impl ThreadClassifier {
    /// Creates a classifier that monitors no thread.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the non-blocking predicate by a function of the current one.
    pub fn extend_non_blocking(
        &mut self,
        f: impl FnOnce(ThreadPredicate) -> ThreadPredicate,
    ) -> &mut Self {
        let current = std::mem::take(&mut self.non_blocking);
        self.non_blocking = f(current);
        self
    }

    /// ORs a predicate into the non-blocking predicate.
    pub fn or_non_blocking(&mut self, predicate: impl Into<ThreadPredicate>) -> &mut Self {
        let predicate = predicate.into();
        self.extend_non_blocking(|current| current.or(predicate))
    }

    /// Replaces the dynamic predicate by a function of the current one.
    pub fn extend_dynamic(
        &mut self,
        f: impl FnOnce(ThreadPredicate) -> ThreadPredicate,
    ) -> &mut Self {
        let current = std::mem::take(&mut self.dynamic);
        self.dynamic = f(current);
        self
    }

    /// ORs a predicate into the dynamic predicate.
    pub fn or_dynamic(&mut self, predicate: impl Into<ThreadPredicate>) -> &mut Self {
        let predicate = predicate.into();
        self.extend_dynamic(|current| current.or(predicate))
    }

    /// Evaluates the non-blocking predicate for `thread`.
    pub fn is_monitored(&self, thread: &Thread) -> bool {
        self.non_blocking.test(thread)
    }

    /// Evaluates the dynamic predicate for `thread`.
    pub fn is_dynamic(&self, thread: &Thread) -> bool {
        self.dynamic.test(thread)
    }

    /// Evaluates both predicates once on the calling thread.
    ///
    /// Predicates often capture lazily initialized state; running them here
    /// moves that initialization out of the first guarded call.
    pub fn warm_up(&self) {
        let thread = std::thread::current();
        let dynamic = self.is_dynamic(&thread);
        let monitored = self.is_monitored(&thread);
        debug!(
            "Thread predicates warmed up on {:?}: monitored={}, dynamic={}",
            thread.name(),
            monitored,
            dynamic
        );
    }
}
