//! Tokio runtime integration.
//!
//! tokio gives its scheduler workers and its blocking-pool threads the same
//! name, so a name only tells that a thread belongs to a runtime. Workers
//! are recognized by the non-blocking mark, which the park and unpark hooks
//! installed by [`instrument`] set. Blocking-pool threads never park
//! through the scheduler and stay unmarked, so work sent to plain
//! `tokio::task::spawn_blocking` is not monitored.
//!
//! | Thread | Classification |
//! |--------|----------------|
//! | started by an instrumented runtime, or named with a runtime prefix | dynamic |
//! | carries the non-blocking mark | monitored |
//!
//! With the `tokio` feature, [`TokioIntegration`] applies this
//! classification and allows blocking inside [`spawn_blocking`] and
//! [`block_in_place`]. Without the feature it only logs that it was skipped.
//!
//! ## Limitations
//!
//! - Runtimes not built through [`instrument`] or [`runtime_builder`] are not monitored
//! - A worker is monitored from its first park on; tasks it picks up while
//!   starting may run unchecked
//! - A worker that gave its scheduler away in `block_in_place` keeps the mark
//!   when it returns to the blocking pool
//!
//! ```rust,no_run
//! use stallguard_core::integrations::tokio::runtime_builder;
//!
//! let runtime = runtime_builder().worker_threads(4).build()?;
//! runtime.block_on(async { /* monitored tasks */ });
//! # Ok::<(), std::io::Error>(())
//! ```

use crate::builder::Builder;
use crate::config::{StallguardConfig, DEFAULT_WORKER_PREFIX, LEGACY_WORKER_PREFIX};
use crate::extension::Extension;

/// Owner of the tokio escape-hatch frames.
pub const OWNER: &str = "stallguard_core::integrations::tokio";

#[cfg(feature = "tokio")]
thread_local! {
    static RUNTIME_THREAD: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Extension monitoring tokio worker threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokioIntegration {
    worker_prefix: String,
}

impl TokioIntegration {
    /// Catalog name.
    pub const NAME: &'static str = "tokio";

    /// Creates the integration with the default worker prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            worker_prefix: DEFAULT_WORKER_PREFIX.to_string(),
        }
    }

    /// Creates the integration from the `[tokio]` section.
    #[must_use]
    pub fn from_config(config: &StallguardConfig) -> Self {
        Self::new().with_worker_prefix(config.tokio.worker_prefix.clone())
    }

    /// Sets an additional runtime thread name prefix.
    #[must_use]
    pub fn with_worker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.worker_prefix = prefix.into();
        self
    }

    /// Configured runtime thread name prefix.
    pub fn worker_prefix(&self) -> &str {
        &self.worker_prefix
    }

    /// Returns `true` if `name` looks like a runtime thread: it starts with
    /// the configured prefix or one of tokio's default names.
    pub fn is_runtime_thread_name(&self, name: &str) -> bool {
        [
            self.worker_prefix.as_str(),
            DEFAULT_WORKER_PREFIX,
            LEGACY_WORKER_PREFIX,
        ]
        .iter()
        .any(|prefix| !prefix.is_empty() && name.starts_with(prefix))
    }
}

impl Default for TokioIntegration {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for TokioIntegration {
    #[cfg(feature = "tokio")]
    fn apply_to(&self, builder: &mut Builder) {
        use stallguard_monitor::ThreadPredicate;

        let names = self.clone();
        let runtime_threads = ThreadPredicate::new(move |thread| {
            is_runtime_thread()
                || thread
                    .name()
                    .is_some_and(|name| names.is_runtime_thread_name(name))
        });
        builder
            .non_blocking_thread_predicate(|current| {
                current.or(ThreadPredicate::marked_non_blocking())
            })
            .add_dynamic_thread_predicate(runtime_threads)
            .allow_blocking_calls_inside(OWNER, "spawn_blocking")
            .allow_blocking_calls_inside(OWNER, "block_in_place");
    }

    #[cfg(not(feature = "tokio"))]
    fn apply_to(&self, _builder: &mut Builder) {
        tracing::debug!("tokio support is not compiled in; skipping the tokio integration");
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

/// Returns `true` on a thread started by an instrumented runtime.
#[cfg(feature = "tokio")]
pub fn is_runtime_thread() -> bool {
    RUNTIME_THREAD.get()
}

/// Installs the hooks that tell workers apart from blocking-pool threads.
///
/// Replaces any `on_thread_start`, `on_thread_park` or `on_thread_unpark`
/// hook already set on `builder`.
#[cfg(feature = "tokio")]
pub fn instrument(builder: &mut ::tokio::runtime::Builder) -> &mut ::tokio::runtime::Builder {
    use stallguard_monitor::mark_current_thread_non_blocking;

    builder
        .on_thread_start(|| RUNTIME_THREAD.set(true))
        .on_thread_park(mark_current_thread_non_blocking)
        .on_thread_unpark(mark_current_thread_non_blocking)
}

/// A multi-thread runtime builder with all drivers enabled and the hooks
/// from [`instrument`].
#[cfg(feature = "tokio")]
pub fn runtime_builder() -> ::tokio::runtime::Builder {
    let mut builder = ::tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    instrument(&mut builder);
    builder
}

/// Runs `f` on tokio's blocking pool inside an allowed frame.
#[cfg(feature = "tokio")]
pub fn spawn_blocking<F, R>(f: F) -> ::tokio::task::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    ::tokio::task::spawn_blocking(move || {
        let _frame = stallguard_intercept::frame!("stallguard_core::integrations::tokio", "spawn_blocking");
        f()
    })
}

/// Runs `f` on the current worker via `tokio::task::block_in_place`, inside
/// an allowed frame.
///
/// Requires the multi-threaded runtime.
#[cfg(feature = "tokio")]
pub fn block_in_place<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    ::tokio::task::block_in_place(move || {
        let _frame = stallguard_intercept::frame!("stallguard_core::integrations::tokio", "block_in_place");
        f()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_from_config() {
        let config = StallguardConfig::default().with_worker_prefix("rt-worker");
        assert_eq!(TokioIntegration::from_config(&config).worker_prefix(), "rt-worker");
        assert_eq!(TokioIntegration::new().worker_prefix(), DEFAULT_WORKER_PREFIX);
    }

    #[test]
    fn test_runtime_names_match_current_and_legacy_defaults() {
        let integration = TokioIntegration::new().with_worker_prefix("io-");
        assert!(integration.is_runtime_thread_name("tokio-rt-worker"));
        assert!(integration.is_runtime_thread_name("tokio-runtime-worker"));
        assert!(integration.is_runtime_thread_name("io-3"));
        assert!(!integration.is_runtime_thread_name("main"));
        assert!(!TokioIntegration::new()
            .with_worker_prefix("")
            .is_runtime_thread_name("main"));
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn test_default_runtime_thread_name_is_recognized() {
        let runtime = ::tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let name = runtime
            .block_on(async {
                ::tokio::task::spawn_blocking(|| {
                    std::thread::current().name().map(str::to_owned)
                })
                .await
            })
            .unwrap()
            .unwrap_or_default();
        assert!(
            TokioIntegration::new().is_runtime_thread_name(&name),
            "unrecognized runtime thread name {name:?}"
        );
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn test_only_instrumented_workers_carry_the_mark() {
        use stallguard_monitor::is_marked_non_blocking;
        use std::time::Duration;

        let runtime = runtime_builder().worker_threads(1).build().unwrap();
        let (worker, pool) = runtime.block_on(async {
            // Let the idle worker park once.
            ::tokio::time::sleep(Duration::from_millis(50)).await;
            let worker = ::tokio::spawn(async { (is_marked_non_blocking(), is_runtime_thread()) })
                .await
                .unwrap();
            let pool = ::tokio::task::spawn_blocking(|| (is_marked_non_blocking(), is_runtime_thread()))
                .await
                .unwrap();
            (worker, pool)
        });
        assert_eq!(worker, (true, true));
        assert_eq!(pool, (false, true));
        assert!(!is_runtime_thread());
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn test_registers_escape_hatches() {
        let mut builder = Builder::new();
        builder.with(TokioIntegration::new());
        let plan = builder.registry.clone().freeze();
        assert_eq!(plan.directive(OWNER, "spawn_blocking", "*"), Some(true));
        assert_eq!(plan.directive(OWNER, "block_in_place", "*"), Some(true));
    }
}
