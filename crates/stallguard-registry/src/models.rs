//! # Core Data Models for the Registry
//!
//! Identifiers for guarded operations and scope directives, plus the
//! serializable snapshot format used by diagnostics.
//!
//! ## Key Shape
//!
//! Every entry is addressed by `(owner, name, signature)`:
//!
//! | Part | Example | Notes |
//! |------|---------|-------|
//! | owner | `std::thread` | Module path or type path |
//! | name | `sleep` | Operation name, or [`STATIC_INITIALIZER`] |
//! | signature | `(Duration)` or `*` | `*` matches every overload |
//!
//! A concrete signature always wins over `*` for the same owner and name.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wildcard signature text matching any overload of an operation.
pub const ANY_SIGNATURE: &str = "*";

/// Reserved operation name for a type's one-time initializer scope.
///
/// In Rust this is the body of a `LazyLock`/`OnceLock` initializer (or any
/// other run-once block) that the owner wraps in a static-init frame.
pub const STATIC_INITIALIZER: &str = "<static-init>";

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised while populating a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The key is missing an owner or an operation name.
    #[error("invalid operation key {owner:?}/{name:?}: {reason}")]
    InvalidKey {
        /// Owner as supplied.
        owner: String,
        /// Operation name as supplied.
        name: String,
        /// Why the key was rejected.
        reason: &'static str,
    },

    /// The signature text is empty.
    #[error("empty signature for {owner}::{name} (use \"*\" to match any overload)")]
    EmptySignature {
        /// Owner of the operation.
        owner: String,
        /// Operation name.
        name: String,
    },
}

/// Signature part of an [`OperationKey`].
///
/// Ordering places [`Signature::Any`] first so snapshots list the wildcard
/// entry before concrete overloads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Signature {
    /// Matches any overload (`"*"`).
    Any,
    /// Matches exactly this signature text.
    Exact(String),
}

impl Signature {
    /// Parses signature text; `"*"` becomes [`Signature::Any`].
    pub fn parse(text: &str) -> Self {
        if text == ANY_SIGNATURE {
            Signature::Any
        } else {
            Signature::Exact(text.to_string())
        }
    }

    /// Returns `true` for the wildcard signature.
    pub fn is_any(&self) -> bool {
        matches!(self, Signature::Any)
    }

    /// Signature text as written in configuration.
    pub fn as_str(&self) -> &str {
        match self {
            Signature::Any => ANY_SIGNATURE,
            Signature::Exact(text) => text,
        }
    }
}

impl From<&str> for Signature {
    fn from(text: &str) -> Self {
        Signature::parse(text)
    }
}

impl From<String> for Signature {
    fn from(text: String) -> Self {
        if text == ANY_SIGNATURE {
            Signature::Any
        } else {
            Signature::Exact(text)
        }
    }
}

impl From<Signature> for String {
    fn from(signature: Signature) -> Self {
        match signature {
            Signature::Any => ANY_SIGNATURE.to_string(),
            Signature::Exact(text) => text,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a callable operation.
///
/// # Example
///
/// ```rust
/// use stallguard_registry::{OperationKey, Signature};
///
/// let key = OperationKey::new("std::thread", "sleep", "*").unwrap();
/// assert_eq!(key.signature, Signature::Any);
/// assert_eq!(key.to_string(), "std::thread::sleep*");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationKey {
    /// Module or type path owning the operation.
    pub owner: String,

    /// Operation name.
    pub name: String,

    /// Overload selector.
    pub signature: Signature,
}

impl OperationKey {
    /// Builds a validated key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidKey`] when `owner` or `name` is blank,
    /// and [`RegistryError::EmptySignature`] when the signature text is empty.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        let signature = signature.into();

        if owner.trim().is_empty() {
            return Err(RegistryError::InvalidKey {
                owner,
                name,
                reason: "owner must not be empty",
            });
        }
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidKey {
                owner,
                name,
                reason: "operation name must not be empty",
            });
        }
        if let Signature::Exact(text) = &signature {
            if text.is_empty() {
                return Err(RegistryError::EmptySignature { owner, name });
            }
        }

        Ok(Self {
            owner,
            name,
            signature,
        })
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}{}", self.owner, self.name, self.signature)
    }
}

/// One blocking-set entry in a [`RegistrySnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingEntry {
    /// The operation.
    #[serde(flatten)]
    pub key: OperationKey,
    /// Whether the operation is currently treated as blocking.
    pub enabled: bool,
}

/// One scope directive in a [`RegistrySnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveEntry {
    /// The frame the directive applies to.
    #[serde(flatten)]
    pub key: OperationKey,
    /// `true` allows blocking calls inside the frame, `false` disallows them.
    pub allowed: bool,
}

/// Serializable view of a frozen registry.
///
/// Entries are sorted by owner, name, then signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Blocking-set entries.
    pub blocking: Vec<BlockingEntry>,
    /// Scope directives.
    pub directives: Vec<DirectiveEntry>,
}
