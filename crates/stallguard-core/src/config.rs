//! Configuration types and the `stallguard.toml` manifest.
//!
//! ```toml
//! [install]
//! self_test = true
//! self_test_timeout_ms = 5000
//! load_integrations = true
//!
//! [reporting]
//! mode = "panic"          # "panic" | "log" | "ignore"
//! capture_backtrace = false
//!
//! [tokio]
//! worker_prefix = "tokio-rt-worker"
//!
//! [[extensions]]
//! name = "tokio"
//!
//! [[blocking]]
//! owner = "app::Db"
//! name = "query"
//!
//! [[allow]]
//! owner = "app::Cache"
//! name = "warm"
//! signature = "*"
//! ```
//!
//! Every section is optional. When `[[extensions]]` is absent every
//! extension in the catalog is discovered; when present it lists the
//! extensions to load, in order.

use crate::error::{Result, StallguardError};
use serde::{Deserialize, Serialize};
use stallguard_registry::ANY_SIGNATURE;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the manifest path.
pub const CONFIG_ENV: &str = "STALLGUARD_CONFIG";

/// Manifest looked up in the working directory.
pub const DEFAULT_MANIFEST: &str = "stallguard.toml";

/// Default tokio runtime thread name prefix.
pub const DEFAULT_WORKER_PREFIX: &str = "tokio-rt-worker";

/// Runtime thread name prefix used by older tokio releases.
pub const LEGACY_WORKER_PREFIX: &str = "tokio-runtime-worker";

/// Complete Stallguard configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StallguardConfig {
    /// Installation settings.
    pub install: InstallConfig,

    /// What happens on a violation.
    pub reporting: ReportingConfig,

    /// Named extensions, in discovery order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<ExtensionRef>>,

    /// Additional blocking operations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocking: Vec<OperationRule>,

    /// Frames inside which blocking is allowed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<OperationRule>,

    /// Frames inside which blocking is reported again.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disallow: Vec<OperationRule>,

    /// Tokio integration settings.
    pub tokio: TokioConfig,
}

/// `[install]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Run the self-test after interception starts.
    pub self_test: bool,

    /// How long to wait for the self-test verdict.
    pub self_test_timeout_ms: u64,

    /// Discover extensions when installing through [`crate::install`].
    pub load_integrations: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            self_test: true,
            self_test_timeout_ms: 5_000,
            load_integrations: true,
        }
    }
}

/// Violation handling mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingMode {
    /// Panic with a `BlockingOperationError`.
    #[default]
    Panic,
    /// Log at `warn` and continue.
    Log,
    /// Do nothing.
    Ignore,
}

/// `[reporting]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Reporter selection.
    pub mode: ReportingMode,

    /// Always capture a backtrace in panic mode, regardless of `RUST_BACKTRACE`.
    pub capture_backtrace: bool,
}

/// `[tokio]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokioConfig {
    /// Name prefix of runtime threads, in addition to the tokio defaults.
    pub worker_prefix: String,
}

impl Default for TokioConfig {
    fn default() -> Self {
        Self {
            worker_prefix: DEFAULT_WORKER_PREFIX.to_string(),
        }
    }
}

/// One `[[extensions]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRef {
    /// Catalog name.
    pub name: String,
}

/// One `[[blocking]]`, `[[allow]]` or `[[disallow]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRule {
    /// Owner path.
    pub owner: String,
    /// Operation or frame name.
    pub name: String,
    /// Signature text (defaults to `"*"`).
    #[serde(default = "any_signature")]
    pub signature: String,
}

fn any_signature() -> String {
    ANY_SIGNATURE.to_string()
}

impl StallguardConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses manifest text.
    ///
    /// # Errors
    ///
    /// Returns [`StallguardError::Manifest`] on invalid TOML or mistyped values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| StallguardError::Manifest {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`StallguardError::Manifest`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| StallguardError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| StallguardError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Locates and loads the manifest.
    ///
    /// `STALLGUARD_CONFIG` wins and must name a readable file. Otherwise
    /// `stallguard.toml` in the working directory is used if present.
    /// Returns `None` when there is no manifest.
    ///
    /// # Errors
    ///
    /// Returns [`StallguardError::Manifest`] if the located file is unusable.
    pub fn discover() -> Result<Option<(PathBuf, Self)>> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => {
                let path = PathBuf::from(DEFAULT_MANIFEST);
                if !path.is_file() {
                    debug!("No {} found, using defaults", DEFAULT_MANIFEST);
                    return Ok(None);
                }
                path
            }
        };
        let config = Self::load(&path)?;
        debug!("Loaded manifest from {}", path.display());
        Ok(Some((path, config)))
    }

    /// Serializes back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`StallguardError::Configuration`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StallguardError::Configuration(e.to_string()))
    }

    /// Self-test wait limit.
    pub fn self_test_timeout(&self) -> Duration {
        Duration::from_millis(self.install.self_test_timeout_ms)
    }

    /// Returns `true` if the manifest declares blocking or scope rules.
    pub fn has_rules(&self) -> bool {
        !(self.blocking.is_empty() && self.allow.is_empty() && self.disallow.is_empty())
    }

    /// Enables or disables the self-test.
    #[must_use]
    pub fn with_self_test(mut self, enabled: bool) -> Self {
        self.install.self_test = enabled;
        self
    }

    /// Sets the self-test wait limit.
    #[must_use]
    pub fn with_self_test_timeout(mut self, timeout: Duration) -> Self {
        self.install.self_test_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enables or disables extension discovery.
    #[must_use]
    pub fn with_load_integrations(mut self, enabled: bool) -> Self {
        self.install.load_integrations = enabled;
        self
    }

    /// Sets the reporting mode.
    #[must_use]
    pub fn with_reporting_mode(mut self, mode: ReportingMode) -> Self {
        self.reporting.mode = mode;
        self
    }

    /// Forces backtrace capture in panic mode.
    #[must_use]
    pub fn with_capture_backtrace(mut self, enabled: bool) -> Self {
        self.reporting.capture_backtrace = enabled;
        self
    }

    /// Sets the tokio worker thread name prefix.
    #[must_use]
    pub fn with_worker_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tokio.worker_prefix = prefix.into();
        self
    }
}
