//! Error types for Stallguard Core.

use stallguard_intercept::InterceptError;
use stallguard_registry::RegistryError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for installation and configuration.
pub type Result<T> = std::result::Result<T, StallguardError>;

/// Core error type.
#[derive(Debug, Error)]
pub enum StallguardError {
    /// Installation could not be verified, or settings are unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A manifest file could not be read or parsed.
    #[error("Manifest error in {}: {message}", path.display())]
    Manifest {
        /// File that failed.
        path: PathBuf,
        /// Reader or parser message.
        message: String,
    },

    /// A manifest names an extension the catalog does not know.
    #[error("Unknown extension {name:?} (known extensions: {known})")]
    UnknownExtension {
        /// Name as written in the manifest.
        name: String,
        /// Comma-separated catalog names.
        known: String,
    },

    /// Registry error passthrough.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Interception error passthrough.
    #[error("Interception error: {0}")]
    Intercept(#[from] InterceptError),
}
