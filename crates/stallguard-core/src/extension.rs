//! # Extensions
//!
//! An extension is a unit of configuration applied to a [`Builder`] before
//! installation: extra blocking operations, scope directives, thread
//! predicates, or a reporter.
//!
//! ## Ordering
//!
//! ```text
//!   discovered (manifest order) ++ explicit (argument order)
//!                      │
//!          stable sort by priority, ascending
//!                      │
//!                apply in that order
//! ```
//!
//! Equal priorities keep their concatenated order, so a later extension
//! with the same priority sees, and can override, an earlier one's work.

use crate::builder::Builder;
use crate::config::StallguardConfig;
use crate::error::{Result, StallguardError};
use crate::integrations::tokio::TokioIntegration;
use std::collections::BTreeMap;
use std::fmt;

/// A pluggable configuration unit.
pub trait Extension: Send + Sync {
    /// Mutates the builder.
    fn apply_to(&self, builder: &mut Builder);

    /// Application order; lower runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Closures taking `&mut Builder` are extensions with priority 0.
impl<F> Extension for F
where
    F: Fn(&mut Builder) + Send + Sync,
{
    fn apply_to(&self, builder: &mut Builder) {
        self(builder);
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Merges discovered and explicit extensions into application order.
///
/// # Example
///
/// ```rust
/// use stallguard_core::{order_extensions, Builder, Extension};
///
/// struct Late;
/// impl Extension for Late {
///     fn apply_to(&self, _: &mut Builder) {}
///     fn priority(&self) -> i32 { 10 }
///     fn name(&self) -> &str { "late" }
/// }
///
/// let discovered: Vec<Box<dyn Extension>> = vec![Box::new(Late)];
/// let explicit: Vec<Box<dyn Extension>> = vec![Box::new(|_: &mut Builder| {})];
/// let names: Vec<_> = order_extensions(discovered, explicit)
///     .iter()
///     .map(|e| e.name().to_string())
///     .collect();
/// assert_eq!(names, ["closure", "late"]);
/// ```
pub fn order_extensions(
    discovered: Vec<Box<dyn Extension>>,
    explicit: Vec<Box<dyn Extension>>,
) -> Vec<Box<dyn Extension>> {
    let mut ordered: Vec<_> = discovered.into_iter().chain(explicit).collect();
    ordered.sort_by_key(|extension| extension.priority());
    ordered
}

type Factory = Box<dyn Fn(&StallguardConfig) -> Box<dyn Extension> + Send + Sync>;

/// Named extension factories that manifests refer to.
pub struct ExtensionCatalog {
    factories: BTreeMap<String, Factory>,
}

impl ExtensionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Creates a catalog holding the built-in integrations.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(TokioIntegration::NAME, |config| {
            Box::new(TokioIntegration::from_config(config))
        });
        catalog
    }

    /// Registers a factory, replacing any with the same name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&StallguardConfig) -> Box<dyn Extension> + Send + Sync + 'static,
    ) -> &mut Self {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the extension registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StallguardError::UnknownExtension`] if `name` is not registered.
    pub fn resolve(&self, name: &str, config: &StallguardConfig) -> Result<Box<dyn Extension>> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory(config)),
            None => Err(StallguardError::UnknownExtension {
                name: name.to_string(),
                known: self.names().collect::<Vec<_>>().join(", "),
            }),
        }
    }

    /// Builds every registered extension, in name order.
    pub fn resolve_all(&self, config: &StallguardConfig) -> Vec<Box<dyn Extension>> {
        self.factories.values().map(|factory| factory(config)).collect()
    }
}

impl Default for ExtensionCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ExtensionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
