//! # Scope State Tracker
//!
//! Per-thread state consulted by every guarded call.
//!
//! ## State Machine
//!
//! ```text
//!                    first check / first scope entry
//!   Unclassified ──────────────────────────────────────┐
//!                                                      │
//!          is_dynamic? ── yes ──▶ Dynamic (is_monitored re-run per check)
//!               │
//!               no
//!               │
//!          is_monitored? ── yes ──▶ CachedMonitored
//!               │
//!               no ──▶ CachedNotMonitored (fast path, scopes inert)
//! ```
//!
//! ## Check
//!
//! 1. `CachedNotMonitored`: return.
//! 2. `Dynamic`: re-run `is_monitored`; return if false.
//! 3. Inside an allowed scope: return.
//! 4. Report the violation.
//!
//! ## Scopes
//!
//! [`ScopeTracker::enter_scope`] sets the thread's `allowed` flag and returns
//! a [`ScopeGuard`] that restores the previous value on drop, including
//! during a panic unwind. Guards nest LIFO and cannot leave their thread.
//!
//! The state lives in a thread-local cell tagged with the tracker's
//! generation, so two trackers in one process never read each other's state.

use crate::classifier::ThreadClassifier;
use crate::probe;
use crate::reporter::ViolationReporter;
use crate::violation::ViolationRecord;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Classification state of the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Not yet checked by this tracker.
    Unclassified,
    /// Not monitored; checks return immediately.
    CachedNotMonitored,
    /// Monitored; verdict cached.
    CachedMonitored,
    /// Verdict re-evaluated on every check.
    Dynamic,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u64,
    state: ThreadState,
    allowed: bool,
}

impl Slot {
    const EMPTY: Slot = Slot {
        generation: 0,
        state: ThreadState::Unclassified,
        allowed: false,
    };
}

thread_local! {
    static SLOT: Cell<Slot> = const { Cell::new(Slot::EMPTY) };
}

/// Runtime check behind every guarded call.
pub struct ScopeTracker {
    generation: u64,
    classifier: ThreadClassifier,
    reporter: Arc<dyn ViolationReporter>,
}

impl ScopeTracker {
    /// Creates a tracker with a fresh generation.
    pub fn new(classifier: ThreadClassifier, reporter: Arc<dyn ViolationReporter>) -> Self {
        Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            classifier,
            reporter,
        }
    }

    /// The classifier this tracker consults.
    pub fn classifier(&self) -> &ThreadClassifier {
        &self.classifier
    }

    /// The current thread's state as seen by this tracker.
    ///
    /// Does not classify the thread.
    pub fn thread_state(&self) -> ThreadState {
        let slot = SLOT.get();
        if slot.generation == self.generation {
            slot.state
        } else {
            ThreadState::Unclassified
        }
    }

    /// Returns `true` if the current thread is inside an allowed scope.
    pub fn is_allowed(&self) -> bool {
        let slot = SLOT.get();
        slot.generation == self.generation && slot.allowed
    }

    fn slot(&self) -> Slot {
        let slot = SLOT.get();
        if slot.generation == self.generation {
            return slot;
        }
        let thread = std::thread::current();
        let state = if self.classifier.is_dynamic(&thread) {
            ThreadState::Dynamic
        } else if self.classifier.is_monitored(&thread) {
            ThreadState::CachedMonitored
        } else {
            ThreadState::CachedNotMonitored
        };
        let slot = Slot {
            generation: self.generation,
            state,
            allowed: false,
        };
        SLOT.set(slot);
        slot
    }

    /// Checks one call to a blocking operation.
    ///
    /// Returns normally when the call may proceed. Otherwise the reporter
    /// runs, and a panicking reporter unwinds out of this call.
    pub fn check(&self, owner: &str, name: &str, is_static: bool) {
        if probe::is_probe_thread() {
            probe::record_detection();
            return;
        }

        let slot = self.slot();
        match slot.state {
            ThreadState::CachedNotMonitored | ThreadState::Unclassified => return,
            ThreadState::Dynamic => {
                if !self.classifier.is_monitored(&std::thread::current()) {
                    return;
                }
            }
            ThreadState::CachedMonitored => {}
        }
        if slot.allowed {
            return;
        }

        // Blocking calls made by the reporter itself are not reported again.
        let _reporting = self.replace_allowed(slot, true);
        self.reporter
            .report(&ViolationRecord::new(owner, name, is_static));
    }

    /// Enters a scope frame carrying a directive.
    ///
    /// The returned guard restores the previous allowance when dropped. On a
    /// thread classified not-monitored the guard does nothing.
    pub fn enter_scope(&self, allowed: bool) -> ScopeGuard {
        let slot = self.slot();
        if slot.state == ThreadState::CachedNotMonitored {
            return ScopeGuard::inert();
        }
        self.replace_allowed(slot, allowed)
    }

    fn replace_allowed(&self, slot: Slot, allowed: bool) -> ScopeGuard {
        if slot.allowed == allowed {
            return ScopeGuard::inert();
        }
        SLOT.set(Slot { allowed, ..slot });
        ScopeGuard {
            restore: Some((self.generation, slot.allowed)),
            _not_send: PhantomData,
        }
    }
}

impl fmt::Debug for ScopeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeTracker")
            .field("generation", &self.generation)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

/// Restores the enclosing allowance when dropped.
///
/// Obtained from [`ScopeTracker::enter_scope`]. Not `Send`: the state it
/// restores belongs to the thread that created it.
#[must_use = "the scope ends when the guard is dropped"]
pub struct ScopeGuard {
    restore: Option<(u64, bool)>,
    _not_send: PhantomData<*const ()>,
}

impl ScopeGuard {
    /// A guard that restores nothing.
    pub fn inert() -> Self {
        Self {
            restore: None,
            _not_send: PhantomData,
        }
    }

    /// Returns `true` if dropping the guard changes thread state.
    pub fn is_active(&self) -> bool {
        self.restore.is_some()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let Some((generation, previous)) = self.restore else {
            return;
        };
        // The slot may already be gone when a guard is dropped during thread exit.
        let _ = SLOT.try_with(|cell| {
            let slot = cell.get();
            if slot.generation == generation {
                cell.set(Slot {
                    allowed: previous,
                    ..slot
                });
            }
        });
    }
}

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("active", &self.is_active())
            .finish()
    }
}
