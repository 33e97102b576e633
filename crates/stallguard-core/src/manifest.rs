//! Declarative extension discovery.
//!
//! The manifest's `[[extensions]]` entries resolve against an
//! [`ExtensionCatalog`] in the order written; without that section every
//! catalog entry is discovered. The manifest's own `[[blocking]]`,
//! `[[allow]]` and `[[disallow]]` rules form one more discovered extension,
//! appended last.

use crate::builder::Builder;
use crate::config::{OperationRule, StallguardConfig};
use crate::error::Result;
use crate::extension::{Extension, ExtensionCatalog};
use tracing::debug;

/// Name reported by the manifest rules extension.
pub const MANIFEST_RULES: &str = "manifest-rules";

/// Resolves the discovered extensions for `config`.
///
/// # Errors
///
/// Returns [`StallguardError::UnknownExtension`](crate::StallguardError::UnknownExtension)
/// for a name the catalog does not hold.
pub fn discover_extensions(
    config: &StallguardConfig,
    catalog: &ExtensionCatalog,
) -> Result<Vec<Box<dyn Extension>>> {
    let mut discovered = match &config.extensions {
        Some(named) => named
            .iter()
            .map(|entry| catalog.resolve(&entry.name, config))
            .collect::<Result<Vec<_>>>()?,
        None => catalog.resolve_all(config),
    };
    if config.has_rules() {
        discovered.push(Box::new(ManifestRules::from_config(config)));
    }
    debug!(
        "Discovered {} extension(s): {:?}",
        discovered.len(),
        discovered.iter().map(|e| e.name()).collect::<Vec<_>>()
    );
    Ok(discovered)
}

/// Blocking and scope rules written in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestRules {
    blocking: Vec<OperationRule>,
    allow: Vec<OperationRule>,
    disallow: Vec<OperationRule>,
}

impl ManifestRules {
    /// Copies the rules out of `config`.
    pub fn from_config(config: &StallguardConfig) -> Self {
        Self {
            blocking: config.blocking.clone(),
            allow: config.allow.clone(),
            disallow: config.disallow.clone(),
        }
    }
}

impl Extension for ManifestRules {
    fn apply_to(&self, builder: &mut Builder) {
        for rule in &self.blocking {
            builder.mark_as_blocking(&rule.owner, &rule.name, rule.signature.as_str());
        }
        for rule in &self.allow {
            builder.allow_blocking_calls_inside_signature(
                &rule.owner,
                &rule.name,
                rule.signature.as_str(),
            );
        }
        for rule in &self.disallow {
            builder.disallow_blocking_calls_inside_signature(
                &rule.owner,
                &rule.name,
                rule.signature.as_str(),
            );
        }
    }

    fn name(&self) -> &str {
        MANIFEST_RULES
    }
}
