//! # Installer & Self-Test
//!
//! One-shot, process-wide installation.
//!
//! ## Sequence
//!
//! ```text
//! claim flag (CAS) ──▶ apply extensions ──▶ freeze registry + build tracker
//!        │                                          │
//!   already claimed                       warm up predicates
//!        ▼                                          │
//!  AlreadyInstalled                      mark + preload probe site
//!                                                   │
//!                                        begin_guarding (retroactive pass)
//!                                                   │
//!                                        self-test on "stallguard-self-test"
//! ```
//!
//! The flag is never released: a failed installation leaves the process
//! claimed and later attempts return [`Installation::AlreadyInstalled`].

use crate::builder::Builder;
use crate::error::{Result, StallguardError};
use stallguard_intercept::{CallSite, InstrumentationReport, InterceptionCapability, SiteInventory};
use stallguard_monitor::{probe, ScopeTracker};
use stallguard_registry::{FrozenRegistry, ANY_SIGNATURE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Owner of the self-test probe operation.
pub const PROBE_OWNER: &str = "stallguard::self_test";

/// Name of the self-test probe operation.
pub const PROBE_NAME: &str = "probe";

/// Name of the self-test thread.
pub const SELF_TEST_THREAD: &str = "stallguard-self-test";

static INSTALLED: AtomicBool = AtomicBool::new(false);
static INSTALLED_PLAN: OnceLock<Arc<FrozenRegistry>> = OnceLock::new();
static PROBE_SITE: CallSite = CallSite::new(PROBE_OWNER, PROBE_NAME, ANY_SIGNATURE, true);

/// Outcome of an installation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    /// This call installed Stallguard.
    Installed(InstrumentationReport),
    /// An earlier call already claimed installation; nothing was done.
    AlreadyInstalled,
}

impl Installation {
    /// Returns `true` if this call performed the installation.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Installation::Installed(_))
    }

    /// Retroactive pass report of a fresh installation.
    pub fn report(&self) -> Option<&InstrumentationReport> {
        match self {
            Installation::Installed(report) => Some(report),
            Installation::AlreadyInstalled => None,
        }
    }
}

/// Proof of having won the install flag.
pub(crate) struct InstallClaim(());

pub(crate) fn claim() -> Option<InstallClaim> {
    INSTALLED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .ok()
        .map(|_| InstallClaim(()))
}

/// Returns `true` once installation has been claimed.
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::Acquire)
}

/// The registry published by a successful installation.
pub fn installed_plan() -> Option<Arc<FrozenRegistry>> {
    INSTALLED_PLAN.get().cloned()
}

pub(crate) fn complete(_claim: InstallClaim, builder: Builder) -> Result<InstrumentationReport> {
    let Builder {
        mut registry,
        classifier,
        reporter,
        config,
        capability,
        errors,
    } = builder;

    if let Some(err) = errors.into_iter().next() {
        return Err(err.into());
    }

    registry.mark_as_blocking(PROBE_OWNER, PROBE_NAME, ANY_SIGNATURE)?;
    let plan = Arc::new(registry.freeze());
    classifier.warm_up();
    let tracker = Arc::new(ScopeTracker::new(classifier, reporter));

    PROBE_SITE.preload();
    let capability: Arc<dyn InterceptionCapability> = match capability {
        Some(capability) => capability,
        None => Arc::new(SiteInventory::global()),
    };
    let report = capability.begin_guarding(plan.clone(), tracker)?;
    let _ = INSTALLED_PLAN.set(plan.clone());
    info!(
        "Stallguard installed: {} blocking operation(s), {} scope directive(s)",
        plan.blocking_keys().count(),
        plan.directive_len()
    );

    if config.install.self_test {
        self_test(config.self_test_timeout())?;
    } else {
        debug!("Self-test disabled by configuration");
    }
    Ok(report)
}

fn probe_operation() {
    PROBE_SITE.intercept();
}

fn self_test(timeout: Duration) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name(SELF_TEST_THREAD.to_string())
        .spawn(move || {
            probe::enter_probe_thread();
            probe_operation();
            let _ = tx.send(probe::detections() > 0);
        })
        .map_err(|e| {
            StallguardError::Configuration(format!("failed to spawn the self-test thread: {e}"))
        })?;

    match rx.recv_timeout(timeout) {
        Ok(true) => {
            debug!("Self-test observed the probe call");
            Ok(())
        }
        Ok(false) => Err(StallguardError::Configuration(
            "self-test failed: the probe call on the self-test thread was not intercepted. \
             Check that the interception capability publishes the plan and arms loaded call sites."
                .to_string(),
        )),
        Err(_) => Err(StallguardError::Configuration(format!(
            "self-test did not finish within {} ms; raise [install] self_test_timeout_ms \
             or make sure thread predicates do not block",
            timeout.as_millis()
        ))),
    }
}
