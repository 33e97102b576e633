//! # Installation Tests
//!
//! One installation shared by every test in this process. Each test uses
//! its own operation owners so parallel tests can filter the shared
//! recorder.

use stallguard_core::{Installation, Stallguard, StallguardError};
use stallguard_intercept::{frame, guarded_fn, shims};
use stallguard_monitor::{RecordingReporter, ThreadPredicate, ViolationRecord};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

static RECORDER: OnceLock<Arc<RecordingReporter>> = OnceLock::new();
static DYNAMIC_MONITORING: AtomicBool = AtomicBool::new(false);

fn recorder() -> &'static Arc<RecordingReporter> {
    RECORDER.get_or_init(|| {
        let recorder = Arc::new(RecordingReporter::new());
        let mut builder = Stallguard::builder();
        builder
            .blocking_method_callback(recorder.clone())
            .non_blocking_thread_predicate(|current| {
                current
                    .or(ThreadPredicate::name_prefix("nb-"))
                    .or(ThreadPredicate::new(|thread| {
                        thread.name().is_some_and(|name| name.starts_with("dyn-"))
                            && DYNAMIC_MONITORING.load(Ordering::SeqCst)
                    }))
            })
            .add_dynamic_thread_predicate(ThreadPredicate::name_prefix("dyn-"))
            .mark_as_blocking("app::Ledger", "append", "*")
            .mark_as_blocking("app::Dynamic", "poll", "*")
            .mark_as_blocking("app::Pool", "checkout", "*")
            .mark_as_blocking("app::Index", "lookup", "*")
            .mark_as_blocking("app::Audit", "flush", "*")
            .allow_blocking_calls_inside("app::Service", "warm_cache")
            .disallow_blocking_calls_inside("app::Service", "hot_path")
            .allow_blocking_calls_inside("app::Sleeper", "nap");

        let installation = builder.install().unwrap();
        assert!(installation.is_fresh());
        recorder
    })
}

fn records_for(owner: &str) -> Vec<ViolationRecord> {
    recorder()
        .records()
        .into_iter()
        .filter(|record| record.owner == owner)
        .collect()
}

fn on_thread<T: Send + 'static>(name: &str, f: impl FnOnce() -> T + Send + 'static) -> T {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

struct Ledger;

impl Ledger {
    guarded_fn! {
        owner = "app::Ledger";
        fn append(&self, entry: u64) -> u64 { entry + 1 }
    }
}

guarded_fn! {
    owner = "app::Dynamic";
    fn poll() {}
}

guarded_fn! {
    owner = "app::Pool";
    fn checkout() -> usize { 7 }
}

guarded_fn! {
    owner = "app::Index";
    fn lookup() {}
}

guarded_fn! {
    owner = "app::Audit";
    fn flush() {}
}

fn warm_cache(f: impl FnOnce()) {
    let _frame = frame!("app::Service", "warm_cache");
    f();
}

fn hot_path(f: impl FnOnce()) {
    let _frame = frame!("app::Service", "hot_path");
    f();
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn test_blocking_call_on_monitored_thread_is_reported() {
    recorder();
    let result = on_thread("nb-detect", || Ledger.append(41));

    assert_eq!(result, 42);
    assert_eq!(
        records_for("app::Ledger"),
        vec![ViolationRecord::new("app::Ledger", "append", false)]
    );
}

#[test]
fn test_unmonitored_thread_is_not_reported() {
    recorder();
    let value = on_thread("plain-worker", checkout);
    assert_eq!(value, 7);
    assert!(records_for("app::Pool").is_empty());
}

#[test]
fn test_dynamic_thread_follows_flag() {
    recorder();
    on_thread("dyn-poller", || {
        poll();
        DYNAMIC_MONITORING.store(true, Ordering::SeqCst);
        poll();
        DYNAMIC_MONITORING.store(false, Ordering::SeqCst);
        poll();
    });
    assert_eq!(records_for("app::Dynamic").len(), 1);
}

// ============================================================================
// Scopes
// ============================================================================

#[test]
fn test_allow_and_nested_disallow() {
    recorder();
    on_thread("nb-scopes", || {
        warm_cache(|| {
            lookup();
            hot_path(lookup);
            lookup();
        });
    });

    assert_eq!(
        records_for("app::Index"),
        vec![ViolationRecord::new("app::Index", "lookup", true)]
    );
}

#[test]
fn test_allowance_restored_after_panic() {
    recorder();
    on_thread("nb-unwind", || {
        let unwound = catch_unwind(AssertUnwindSafe(|| {
            warm_cache(|| {
                flush();
                panic!("inside allowed frame");
            });
        }));
        assert!(unwound.is_err());
        flush();
    });
    assert_eq!(
        records_for("app::Audit"),
        vec![ViolationRecord::new("app::Audit", "flush", true)]
    );
}

#[test]
fn test_sleep_shim_reported_and_allowed() {
    recorder();
    on_thread("nb-sleeper", || {
        shims::thread::sleep(Duration::from_millis(1));
        let _frame = frame!("app::Sleeper", "nap");
        shims::thread::sleep(Duration::from_millis(1));
    });
    assert_eq!(
        records_for("std::thread"),
        vec![ViolationRecord::new("std::thread", "sleep", true)]
    );
    assert_eq!(format!("{}", records_for("std::thread")[0]), "std::thread::sleep");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_second_install_is_a_no_op() {
    recorder();
    let mut builder = Stallguard::builder();
    builder.mark_as_blocking("app::Second", "never", "*");
    assert_eq!(builder.install().unwrap(), Installation::AlreadyInstalled);

    let plan = Stallguard::installed_plan().unwrap();
    assert!(!plan.is_blocking("app::Second", "never", "()"));
    assert!(plan.is_blocking("app::Ledger", "append", "(u64)"));
    assert!(Stallguard::is_installed());
}

#[test]
fn test_invalid_registration_after_install_is_ignored() {
    recorder();
    let mut builder = Stallguard::builder();
    builder.mark_as_blocking("", "broken", "*");
    let outcome: Result<Installation, StallguardError> = builder.install();
    assert!(matches!(outcome, Ok(Installation::AlreadyInstalled)));
}

#[test]
fn test_discovery_install_after_builder_install() {
    recorder();
    let outcome = stallguard_core::install(Vec::new()).unwrap();
    assert!(!outcome.is_fresh());
    assert!(outcome.report().is_none());
}
