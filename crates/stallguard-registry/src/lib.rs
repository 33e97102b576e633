//! # Stallguard Registry
//!
//! The registry records which operations count as blocking and which frames
//! change the blocking verdict for calls made inside them. It is pure data:
//! nothing here runs on the guarded hot path.
//!
//! ## Contents
//!
//! | Table | Maps | Used by |
//! |-------|------|---------|
//! | Blocking set | `(owner, name, signature) -> enabled` | Call sites |
//! | Scope directives | `(owner, name, signature) -> allowed` | Scope frames |
//!
//! ## Lifecycle
//!
//! ```text
//!   Registry (mutable)  ──freeze()──▶  FrozenRegistry (read-only)
//!        ▲                                   │
//!   builder / extensions               interceptor lookups
//! ```
//!
//! ## Precedence
//!
//! - Concrete signatures override `"*"` for the same owner and name
//! - Later writes to the same exact key overwrite earlier ones
//! - [`STATIC_INITIALIZER`] names a type's run-once initializer frame
//!
//! ## Example
//!
//! ```rust
//! use stallguard_registry::{Registry, STATIC_INITIALIZER};
//!
//! let mut registry = Registry::with_defaults();
//! registry.allow("app::Config", STATIC_INITIALIZER, "*")?;
//! registry.disallow("app::Reactor", "poll", "*")?;
//!
//! let frozen = registry.freeze();
//! assert!(frozen.is_blocking("std::thread", "sleep", "(Duration)"));
//! assert!(frozen.guards_owner("app::Reactor"));
//! # Ok::<(), stallguard_registry::RegistryError>(())
//! ```

pub mod defaults;
mod models;
mod registry;

pub use defaults::{DefaultOperation, DEFAULT_BLOCKING};
pub use models::{
    BlockingEntry, DirectiveEntry, OperationKey, RegistryError, RegistrySnapshot, Result,
    Signature, ANY_SIGNATURE, STATIC_INITIALIZER,
};
pub use registry::{FrozenRegistry, Registry};

#[cfg(test)]
mod tests;
