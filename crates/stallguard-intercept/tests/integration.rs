//! # Integration Tests
//!
//! Publishes one plan to the process-global inventory and checks how sites
//! loaded before and after publication are resolved. The inventory accepts
//! a single plan per process, so the scenario runs as one ordered test.

use stallguard_intercept::shims::sync::GuardedReceiver;
use stallguard_intercept::shims::thread as guarded_thread;
use stallguard_intercept::{
    frame, guarded_fn, static_init_frame, CallSite, CallSiteState, InterceptError,
    InterceptionCapability, ScopeSiteState, SiteInventory,
};
use stallguard_monitor::{RecordingReporter, ScopeTracker, ThreadClassifier, ThreadPredicate};
use stallguard_registry::{Registry, STATIC_INITIALIZER};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

static PRELOADED: CallSite = CallSite::new("app::Store", "load", "*", true);

guarded_fn! {
    owner = "app::Store";
    fn flush(bytes: usize) -> usize { bytes }
}

guarded_fn! {
    owner = "app::Store";
    fn stat() -> u8 { 7 }
}

guarded_fn! {
    owner = "app::Untracked";
    fn untracked() {}
}

fn preloaded_op() {
    PRELOADED.intercept();
}

fn allowed_frame(f: impl FnOnce()) {
    let _frame = frame!("app::Worker", "batch");
    f();
}

fn disallowed_frame(f: impl FnOnce()) {
    let _frame = frame!("app::Worker", "strict");
    f();
}

fn plain_frame(f: impl FnOnce()) {
    let _frame = frame!("app::Worker", "plain");
    f();
}

fn init_frame(f: impl FnOnce()) {
    let _frame = static_init_frame!("app::Config");
    f();
}

fn on_worker<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    thread::Builder::new()
        .name("guarded-worker".to_string())
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_plan_publication_and_site_resolution() {
    // ------------------------------------------------------------------
    // Before publication: sites load disarmed, frames inert
    // ------------------------------------------------------------------
    assert_eq!(PRELOADED.preload(), CallSiteState::Disarmed);
    assert_eq!(flush(3), 3);
    untracked();
    allowed_frame(|| ());
    assert!(!SiteInventory::global().is_guarding());

    // ------------------------------------------------------------------
    // Publication
    // ------------------------------------------------------------------
    let mut registry = Registry::with_defaults();
    registry.mark_as_blocking("app::Store", "load", "*").unwrap();
    registry.mark_as_blocking("app::Store", "flush", "*").unwrap();
    registry.mark_as_blocking("app::Store", "stat", "*").unwrap();
    registry.allow("app::Worker", "batch", "*").unwrap();
    registry.disallow("app::Worker", "strict", "*").unwrap();
    registry.allow("app::Config", STATIC_INITIALIZER, "*").unwrap();
    let plan = Arc::new(registry.freeze());

    let mut classifier = ThreadClassifier::new();
    classifier.or_non_blocking(ThreadPredicate::named("guarded-worker"));
    let recorder = Arc::new(RecordingReporter::new());
    let tracker = Arc::new(ScopeTracker::new(classifier, recorder.clone()));

    let report = SiteInventory::global()
        .begin_guarding(plan.clone(), tracker.clone())
        .unwrap();
    assert!(SiteInventory::global().is_guarding());
    assert_eq!(report.loaded_call_sites, 3);
    assert_eq!(report.armed_call_sites, 2);
    assert_eq!(report.loaded_scope_sites, 1);
    assert_eq!(report.resolved_scope_sites, 1);
    assert_eq!(PRELOADED.state(), CallSiteState::Armed);

    let again = SiteInventory::global().begin_guarding(plan, tracker.clone());
    assert_eq!(again.unwrap_err(), InterceptError::AlreadyGuarding);

    // ------------------------------------------------------------------
    // Retroactively armed and late-loaded sites both fire
    // ------------------------------------------------------------------
    on_worker(|| {
        preloaded_op();
        flush(1);
        stat();
        untracked();
    });
    let names: Vec<_> = recorder.take().into_iter().map(|r| r.to_string()).collect();
    assert_eq!(
        names,
        vec!["app::Store::load", "app::Store::flush", "app::Store::stat"]
    );

    // Unmonitored threads are never reported.
    flush(1);
    assert_eq!(recorder.count(), 0);

    // ------------------------------------------------------------------
    // Scope frames
    // ------------------------------------------------------------------
    on_worker(|| {
        allowed_frame(|| {
            flush(1);
            disallowed_frame(|| {
                flush(2);
            });
            plain_frame(|| {
                flush(3);
            });
        });
        init_frame(|| {
            stat();
        });
    });
    assert_eq!(recorder.take().len(), 1);

    let sites = SiteInventory::global().scope_sites();
    let state_of = |name: &str| {
        sites
            .iter()
            .find(|(descriptor, _)| descriptor.name == name)
            .map(|(_, state)| *state)
    };
    assert_eq!(state_of("batch"), Some(ScopeSiteState::Allow));
    assert_eq!(state_of("strict"), Some(ScopeSiteState::Disallow));
    assert_eq!(state_of("plain"), Some(ScopeSiteState::Inert));
    assert_eq!(state_of(STATIC_INITIALIZER), Some(ScopeSiteState::Allow));

    // ------------------------------------------------------------------
    // Frames restore allowance on unwind
    // ------------------------------------------------------------------
    on_worker(|| {
        allowed_frame(|| {
            let result = catch_unwind(AssertUnwindSafe(|| {
                disallowed_frame(|| panic!("strict section failed"));
            }));
            assert!(result.is_err());
            flush(1);
        });
    });
    assert_eq!(recorder.count(), 0);

    // ------------------------------------------------------------------
    // Shims
    // ------------------------------------------------------------------
    on_worker(|| {
        guarded_thread::sleep(Duration::from_millis(1));
        let (tx, rx) = mpsc::channel();
        tx.send(5u8).unwrap();
        assert_eq!(rx.guarded_recv().unwrap(), 5);
    });
    let names: Vec<_> = recorder.take().into_iter().map(|r| r.to_string()).collect();
    assert_eq!(
        names,
        vec!["std::thread::sleep", "std::sync::mpsc::Receiver#recv"]
    );
}
