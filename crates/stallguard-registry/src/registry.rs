//! # Registry - Blocking Set and Scope Directives
//!
//! [`Registry`] is the mutable configuration collected before installation.
//! [`FrozenRegistry`] is the read-only form handed to the interceptor once
//! installation begins; it has no mutation API, so the guard list cannot
//! change after the interceptor has seen it.
//!
//! ## Lookup Rules
//!
//! 1. An entry with the exact signature of the site wins.
//! 2. Otherwise the `*` entry for the same owner and name applies.
//! 3. Otherwise there is no entry.
//!
//! Writes to the same exact key overwrite earlier writes.

use crate::defaults;
use crate::models::{
    BlockingEntry, DirectiveEntry, OperationKey, RegistrySnapshot, Result, Signature,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// `owner -> name -> signature -> flag`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct KeyTable {
    owners: BTreeMap<String, BTreeMap<String, BTreeMap<Signature, bool>>>,
}

impl KeyTable {
    fn insert(&mut self, key: OperationKey, flag: bool) -> Option<bool> {
        self.owners
            .entry(key.owner)
            .or_default()
            .entry(key.name)
            .or_default()
            .insert(key.signature, flag)
    }

    fn lookup(&self, owner: &str, name: &str, signature: &Signature) -> Option<bool> {
        let overloads = self.owners.get(owner)?.get(name)?;
        if !signature.is_any() {
            if let Some(flag) = overloads.get(signature) {
                return Some(*flag);
            }
        }
        overloads.get(&Signature::Any).copied()
    }

    fn contains_owner(&self, owner: &str) -> bool {
        self.owners.contains_key(owner)
    }

    fn len(&self) -> usize {
        self.owners
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    fn entries(&self) -> impl Iterator<Item = (OperationKey, bool)> + '_ {
        self.owners.iter().flat_map(|(owner, names)| {
            names.iter().flat_map(move |(name, overloads)| {
                overloads.iter().map(move |(signature, flag)| {
                    (
                        OperationKey {
                            owner: owner.clone(),
                            name: name.clone(),
                            signature: signature.clone(),
                        },
                        *flag,
                    )
                })
            })
        })
    }

    /// Counts names carrying both a `*` entry and a concrete entry with a
    /// different flag.
    fn mixed_overloads(&self) -> usize {
        self.owners
            .values()
            .flat_map(BTreeMap::values)
            .filter(|overloads| match overloads.get(&Signature::Any) {
                Some(any) => overloads
                    .iter()
                    .any(|(signature, flag)| !signature.is_any() && flag != any),
                None => false,
            })
            .count()
    }
}

/// Mutable registry of blocking operations and scope directives.
///
/// # Example
///
/// ```rust
/// use stallguard_registry::Registry;
///
/// let mut registry = Registry::new();
/// registry.mark_as_blocking("my::Db", "query", "*").unwrap();
/// registry.allow("my::Db", "warm_cache", "*").unwrap();
///
/// let frozen = registry.freeze();
/// assert!(frozen.is_blocking("my::Db", "query", "(String)"));
/// assert_eq!(frozen.directive("my::Db", "warm_cache", "()"), Some(true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    blocking: KeyTable,
    directives: KeyTable,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the default blocking operations.
    ///
    /// See [`defaults::DEFAULT_BLOCKING`].
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for op in defaults::DEFAULT_BLOCKING {
            registry.blocking.insert(
                OperationKey {
                    owner: op.owner.to_string(),
                    name: op.name.to_string(),
                    signature: Signature::parse(op.signature),
                },
                true,
            );
        }
        registry
    }

    /// Marks an operation as blocking. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid (see [`OperationKey::new`]).
    pub fn mark_as_blocking(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> Result<()> {
        let key = OperationKey::new(owner, name, signature)?;
        debug!("Marking {} as blocking", key);
        self.blocking.insert(key, true);
        Ok(())
    }

    /// Stores the operation with `enabled = false`.
    ///
    /// A disabled exact entry shadows a `*` entry for the same name, which
    /// is how a single overload is exempted from a wildcard registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid.
    pub fn unmark_as_blocking(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> Result<()> {
        let key = OperationKey::new(owner, name, signature)?;
        debug!("Disabling blocking entry {}", key);
        self.blocking.insert(key, false);
        Ok(())
    }

    /// Allows blocking calls made while the given frame is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid.
    pub fn allow(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> Result<()> {
        self.set_directive(OperationKey::new(owner, name, signature)?, true);
        Ok(())
    }

    /// Disallows blocking calls made while the given frame is active, even
    /// inside an enclosing allowed frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid.
    pub fn disallow(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<Signature>,
    ) -> Result<()> {
        self.set_directive(OperationKey::new(owner, name, signature)?, false);
        Ok(())
    }

    /// Writes a directive, returning the value it replaced.
    ///
    /// Last write wins per exact key. A write that flips an existing
    /// directive is logged, since two contributors disagreeing about the
    /// same frame is usually a configuration mistake.
    pub fn set_directive(&mut self, key: OperationKey, allowed: bool) -> Option<bool> {
        let label = key.to_string();
        let previous = self.directives.insert(key, allowed);
        match previous {
            Some(old) if old != allowed => {
                warn!(
                    "Scope directive {} overwritten: allowed {} -> {}",
                    label, old, allowed
                );
            }
            _ => debug!("Scope directive {} set to allowed={}", label, allowed),
        }
        previous
    }

    /// Number of blocking-set entries, enabled or not.
    pub fn blocking_len(&self) -> usize {
        self.blocking.len()
    }

    /// Number of scope directives.
    pub fn directive_len(&self) -> usize {
        self.directives.len()
    }

    /// Finalizes the registry. No further mutation is possible.
    #[must_use]
    pub fn freeze(self) -> FrozenRegistry {
        let mixed = self.directives.mixed_overloads();
        if mixed > 0 {
            debug!(
                "{} scope directive name(s) mix a wildcard with a conflicting concrete signature; \
                 the concrete signature wins",
                mixed
            );
        }
        FrozenRegistry {
            blocking: self.blocking,
            directives: self.directives,
        }
    }
}

/// Read-only registry consumed by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenRegistry {
    blocking: KeyTable,
    directives: KeyTable,
}

impl FrozenRegistry {
    /// Returns `true` if calls to the operation must be checked.
    ///
    /// `signature` is the site's own signature text; `"*"` means the site
    /// does not declare one and only wildcard entries apply.
    pub fn is_blocking(&self, owner: &str, name: &str, signature: &str) -> bool {
        self.blocking
            .lookup(owner, name, &Signature::parse(signature))
            .unwrap_or(false)
    }

    /// Resolves the scope directive for a frame, if any.
    pub fn directive(&self, owner: &str, name: &str, signature: &str) -> Option<bool> {
        self.directives
            .lookup(owner, name, &Signature::parse(signature))
    }

    /// Returns `true` if the owner has any blocking entry or directive.
    ///
    /// Used to select already-loaded sites for retroactive arming.
    pub fn guards_owner(&self, owner: &str) -> bool {
        self.blocking.contains_owner(owner) || self.directives.contains_owner(owner)
    }

    /// Enabled blocking operations.
    pub fn blocking_keys(&self) -> impl Iterator<Item = OperationKey> + '_ {
        self.blocking
            .entries()
            .filter_map(|(key, enabled)| enabled.then_some(key))
    }

    /// All scope directives.
    pub fn directives(&self) -> impl Iterator<Item = (OperationKey, bool)> + '_ {
        self.directives.entries()
    }

    /// Number of blocking-set entries, enabled or not.
    pub fn blocking_len(&self) -> usize {
        self.blocking.len()
    }

    /// Number of scope directives.
    pub fn directive_len(&self) -> usize {
        self.directives.len()
    }

    /// Serializable copy of the registry contents.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            blocking: self
                .blocking
                .entries()
                .map(|(key, enabled)| BlockingEntry { key, enabled })
                .collect(),
            directives: self
                .directives
                .entries()
                .map(|(key, allowed)| DirectiveEntry { key, allowed })
                .collect(),
        }
    }
}
