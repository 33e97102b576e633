//! # Stallguard Core
//!
//! Detects blocking calls made from threads that are supposed to stay
//! non-blocking, such as async runtime workers. Stallguard observes and
//! reports; it never prevents a call.
//!
//! ## Coverage
//!
//! | Layer | Crate | Responsibility |
//! |-------|-------|----------------|
//! | Data | `stallguard-registry` | Blocking set and scope directives |
//! | Runtime | `stallguard-monitor` | Thread classification, scopes, reporting |
//! | Interception | `stallguard-intercept` | Call sites, scope sites, std shims |
//! | Lifecycle | `stallguard-core` | Builder, extensions, install, self-test |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      STALLGUARD CORE                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  manifest ──┐                                                │
//! │             ├──▶ order_extensions ──▶ Builder ──▶ install()  │
//! │  explicit ──┘                            │            │      │
//! │                                          ▼            ▼      │
//! │                                  FrozenRegistry  ScopeTracker│
//! │                                          │            │      │
//! │                                          └─────┬──────┘      │
//! │                                                ▼             │
//! │                                   InterceptionCapability     │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stallguard_core::Stallguard;
//! use stallguard_intercept::shims::thread;
//! use stallguard_monitor::ThreadPredicate;
//! use std::time::Duration;
//!
//! let mut builder = Stallguard::builder();
//! builder.non_blocking_thread_predicate(|current| current.or(ThreadPredicate::named("event-loop")));
//! builder.install()?;
//!
//! std::thread::Builder::new()
//!     .name("event-loop".into())
//!     .spawn(|| thread::sleep(Duration::from_millis(10))) // panics: Blocking call! std::thread::sleep
//!     .unwrap();
//! # Ok::<(), stallguard_core::StallguardError>(())
//! ```
//!
//! ## Notes
//!
//! - Installation happens at most once per process and cannot be undone
//! - Only calls routed through guarded code are seen; see `stallguard_intercept::shims`
//! - A failed self-test aborts installation with a configuration error

mod builder;
mod config;
mod error;
mod extension;
mod installer;
pub mod integrations;
mod manifest;

pub use builder::{AllowSpec, Builder};
pub use config::{
    ExtensionRef, InstallConfig, OperationRule, ReportingConfig, ReportingMode,
    StallguardConfig, TokioConfig, CONFIG_ENV, DEFAULT_MANIFEST, DEFAULT_WORKER_PREFIX,
    LEGACY_WORKER_PREFIX,
};
pub use error::{Result, StallguardError};
pub use extension::{order_extensions, Extension, ExtensionCatalog};
pub use installer::{Installation, PROBE_NAME, PROBE_OWNER, SELF_TEST_THREAD};
pub use manifest::{discover_extensions, ManifestRules, MANIFEST_RULES};

use stallguard_registry::FrozenRegistry;
use std::sync::Arc;
use tracing::debug;

/// Entry points.
pub struct Stallguard;

impl Stallguard {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Returns `true` once installation has been claimed in this process.
    pub fn is_installed() -> bool {
        installer::is_installed()
    }

    /// The registry in force after a successful installation.
    pub fn installed_plan() -> Option<Arc<FrozenRegistry>> {
        installer::installed_plan()
    }
}

/// Installs with discovered extensions followed by `extensions`.
///
/// The manifest is located as described in [`StallguardConfig::discover`]
/// and its extensions resolve against [`ExtensionCatalog::with_builtins`].
///
/// # Errors
///
/// See [`install_with_catalog`].
pub fn install(extensions: Vec<Box<dyn Extension>>) -> Result<Installation> {
    install_with_catalog(extensions, &ExtensionCatalog::with_builtins())
}

/// Installs with discovery against a custom catalog.
///
/// Discovered and explicit extensions are merged by [`order_extensions`]
/// and applied to a builder created from the manifest settings. Discovery
/// is skipped when `[install] load_integrations = false`.
///
/// # Errors
///
/// Fails on an unreadable manifest, an unknown extension name, an invalid
/// registration, or a failed self-test. The process stays marked as
/// installed in every case.
pub fn install_with_catalog(
    extensions: Vec<Box<dyn Extension>>,
    catalog: &ExtensionCatalog,
) -> Result<Installation> {
    let Some(claim) = installer::claim() else {
        debug!("Already installed; ignoring {} extension(s)", extensions.len());
        return Ok(Installation::AlreadyInstalled);
    };

    let config = StallguardConfig::discover()?
        .map(|(_, config)| config)
        .unwrap_or_default();
    let discovered = if config.install.load_integrations {
        discover_extensions(&config, catalog)?
    } else {
        debug!("Extension discovery disabled by configuration");
        Vec::new()
    };

    let mut builder = Builder::from_config(config);
    for extension in order_extensions(discovered, extensions) {
        builder.apply(extension.as_ref());
    }
    installer::complete(claim, builder).map(Installation::Installed)
}

#[cfg(test)]
mod tests;
