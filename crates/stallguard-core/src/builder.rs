//! The installation builder.
//!
//! Collects blocking operations, scope directives, thread predicates and
//! the reporter, then hands them to the installer. Configuration methods
//! take `&mut self` so extensions can share one builder; invalid keys are
//! remembered and fail [`Builder::install`].

use crate::config::{ReportingMode, StallguardConfig};
use crate::error::Result;
use crate::extension::Extension;
use crate::installer::{self, Installation};
use stallguard_intercept::InterceptionCapability;
use stallguard_monitor::{
    IgnoreReporter, LoggingReporter, PanicReporter, ThreadClassifier, ThreadPredicate,
    ViolationReporter,
};
use stallguard_registry::{Registry, RegistryError, Signature, ANY_SIGNATURE, STATIC_INITIALIZER};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configures and installs Stallguard.
///
/// # Example
///
/// ```rust,no_run
/// use stallguard_core::Stallguard;
/// use stallguard_monitor::ThreadPredicate;
///
/// let mut builder = Stallguard::builder();
/// builder
///     .mark_as_blocking("app::Db", "query", "*")
///     .allow_blocking_calls_inside("app::Db", "migrate")
///     .non_blocking_thread_predicate(|current| current.or(ThreadPredicate::name_prefix("loop-")));
/// builder.install()?;
/// # Ok::<(), stallguard_core::StallguardError>(())
/// ```
pub struct Builder {
    pub(crate) registry: Registry,
    pub(crate) classifier: ThreadClassifier,
    pub(crate) reporter: Arc<dyn ViolationReporter>,
    pub(crate) config: StallguardConfig,
    pub(crate) capability: Option<Arc<dyn InterceptionCapability>>,
    pub(crate) errors: Vec<RegistryError>,
}

impl Builder {
    /// Creates a builder with the default blocking operations and settings.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(StallguardConfig::default())
    }

    /// Creates a builder using the install and reporting settings of `config`.
    ///
    /// Manifest rules in `config` are applied through discovery, not here.
    #[must_use]
    pub fn from_config(config: StallguardConfig) -> Self {
        let reporter = reporter_for(&config);
        Self {
            registry: Registry::with_defaults(),
            classifier: ThreadClassifier::new(),
            reporter,
            config,
            capability: None,
            errors: Vec::new(),
        }
    }

    /// Settings in effect.
    pub fn config(&self) -> &StallguardConfig {
        &self.config
    }

    fn record(&mut self, result: std::result::Result<(), RegistryError>) -> &mut Self {
        if let Err(err) = result {
            debug!("Deferring invalid registration: {}", err);
            self.errors.push(err);
        }
        self
    }

    /// Marks an operation as blocking.
    pub fn mark_as_blocking(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> &mut Self {
        let result = self.registry.mark_as_blocking(owner, name, signature);
        self.record(result)
    }

    /// Stops treating one operation (or one overload) as blocking.
    pub fn unmark_as_blocking(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> &mut Self {
        let result = self.registry.unmark_as_blocking(owner, name, signature);
        self.record(result)
    }

    /// Allows blocking calls inside every overload of a frame.
    pub fn allow_blocking_calls_inside(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> &mut Self {
        self.allow_blocking_calls_inside_signature(owner, name, ANY_SIGNATURE)
    }

    /// Allows blocking calls inside one overload of a frame.
    pub fn allow_blocking_calls_inside_signature(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> &mut Self {
        let result = self.registry.allow(owner, name, signature);
        self.record(result)
    }

    /// Reports blocking calls inside every overload of a frame, even when an
    /// enclosing frame allows them.
    pub fn disallow_blocking_calls_inside(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> &mut Self {
        self.disallow_blocking_calls_inside_signature(owner, name, ANY_SIGNATURE)
    }

    /// Reports blocking calls inside one overload of a frame.
    pub fn disallow_blocking_calls_inside_signature(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> &mut Self {
        let result = self.registry.disallow(owner, name, signature);
        self.record(result)
    }

    /// Starts an allowance for several frames of one owner.
    ///
    /// ```rust
    /// let mut builder = stallguard_core::Stallguard::builder();
    /// builder
    ///     .allow_blocking_calls_inside_type("app::Config")
    ///     .for_methods(["reload", "persist"])
    ///     .for_static_initializer();
    /// ```
    pub fn allow_blocking_calls_inside_type(&mut self, owner: impl Into<String>) -> AllowSpec<'_> {
        AllowSpec {
            builder: self,
            owner: owner.into(),
        }
    }

    /// Replaces the violation reporter.
    pub fn blocking_method_callback(
        &mut self,
        reporter: impl ViolationReporter + 'static,
    ) -> &mut Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Replaces the non-blocking predicate by a function of the current one.
    pub fn non_blocking_thread_predicate(
        &mut self,
        f: impl FnOnce(ThreadPredicate) -> ThreadPredicate,
    ) -> &mut Self {
        self.classifier.extend_non_blocking(f);
        self
    }

    /// Replaces the dynamic predicate by a function of the current one.
    pub fn dynamic_thread_predicate(
        &mut self,
        f: impl FnOnce(ThreadPredicate) -> ThreadPredicate,
    ) -> &mut Self {
        self.classifier.extend_dynamic(f);
        self
    }

    /// ORs a predicate into the dynamic predicate.
    pub fn add_dynamic_thread_predicate(
        &mut self,
        predicate: impl Into<ThreadPredicate>,
    ) -> &mut Self {
        self.classifier.or_dynamic(predicate);
        self
    }

    /// Applies an extension now.
    pub fn with(&mut self, extension: impl Extension) -> &mut Self {
        self.apply(&extension);
        self
    }

    pub(crate) fn apply(&mut self, extension: &dyn Extension) {
        debug!(
            "Applying extension {} (priority {})",
            extension.name(),
            extension.priority()
        );
        extension.apply_to(self);
    }

    /// Enables or disables the self-test.
    pub fn self_test(&mut self, enabled: bool) -> &mut Self {
        self.config.install.self_test = enabled;
        self
    }

    /// Sets the self-test wait limit.
    pub fn self_test_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config = std::mem::take(&mut self.config).with_self_test_timeout(timeout);
        self
    }

    /// Uses `capability` instead of the process-global site inventory.
    pub fn interception_capability(
        &mut self,
        capability: impl InterceptionCapability + 'static,
    ) -> &mut Self {
        self.capability = Some(Arc::new(capability));
        self
    }

    /// Installs with this builder's configuration. No discovery is performed.
    ///
    /// # Errors
    ///
    /// Fails on an invalid registration, an interception error, or a failed
    /// self-test. The process stays marked as installed in every case.
    pub fn install(self) -> Result<Installation> {
        let Some(claim) = installer::claim() else {
            debug!("Already installed; ignoring builder configuration");
            return Ok(Installation::AlreadyInstalled);
        };
        installer::complete(claim, self).map(Installation::Installed)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("blocking", &self.registry.blocking_len())
            .field("directives", &self.registry.directive_len())
            .field("classifier", &self.classifier)
            .field("config", &self.config)
            .field("deferred_errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

fn reporter_for(config: &StallguardConfig) -> Arc<dyn ViolationReporter> {
    match config.reporting.mode {
        ReportingMode::Panic => Arc::new(
            PanicReporter::new().with_forced_backtrace(config.reporting.capture_backtrace),
        ),
        ReportingMode::Log => Arc::new(LoggingReporter),
        ReportingMode::Ignore => Arc::new(IgnoreReporter),
    }
}

/// Allowance for frames of one owner, from
/// [`Builder::allow_blocking_calls_inside_type`].
pub struct AllowSpec<'a> {
    builder: &'a mut Builder,
    owner: String,
}

impl<'a> AllowSpec<'a> {
    /// Allows blocking inside each named frame, every overload.
    pub fn for_methods<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.builder
                .allow_blocking_calls_inside(self.owner.clone(), name);
        }
        self
    }

    /// Allows blocking inside the owner's one-time initializer.
    pub fn for_static_initializer(self) -> Self {
        self.builder
            .allow_blocking_calls_inside(self.owner.clone(), STATIC_INITIALIZER);
        self
    }

    /// Returns to the builder.
    pub fn and(self) -> &'a mut Builder {
        self.builder
    }
}
