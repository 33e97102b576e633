//! # Registry Tests
//!
//! Precedence, overwrite and snapshot behavior of [`Registry`] and
//! [`FrozenRegistry`].

use crate::models::{RegistryError, Signature, STATIC_INITIALIZER};
use crate::registry::Registry;

// =============================================================================
// Blocking Set
// =============================================================================

#[test]
fn test_mark_is_idempotent() {
    let mut registry = Registry::new();
    registry.mark_as_blocking("app::Io", "read", "*").unwrap();
    registry.mark_as_blocking("app::Io", "read", "*").unwrap();
    assert_eq!(registry.blocking_len(), 1);

    let frozen = registry.freeze();
    assert!(frozen.is_blocking("app::Io", "read", "(u8)"));
    assert_eq!(frozen.blocking_keys().count(), 1);
}

#[test]
fn test_wildcard_matches_any_overload() {
    let mut registry = Registry::new();
    registry.mark_as_blocking("app::Io", "read", "*").unwrap();
    let frozen = registry.freeze();

    assert!(frozen.is_blocking("app::Io", "read", "()"));
    assert!(frozen.is_blocking("app::Io", "read", "(&mut [u8])"));
    assert!(frozen.is_blocking("app::Io", "read", "*"));
    assert!(!frozen.is_blocking("app::Io", "write", "()"));
    assert!(!frozen.is_blocking("app::Other", "read", "()"));
}

#[test]
fn test_exact_signature_only_matches_itself() {
    let mut registry = Registry::new();
    registry
        .mark_as_blocking("app::Io", "read", "(u64)")
        .unwrap();
    let frozen = registry.freeze();

    assert!(frozen.is_blocking("app::Io", "read", "(u64)"));
    assert!(!frozen.is_blocking("app::Io", "read", "()"));
    // A site without a declared signature only sees wildcard entries.
    assert!(!frozen.is_blocking("app::Io", "read", "*"));
}

#[test]
fn test_disabled_exact_entry_shadows_wildcard() {
    let mut registry = Registry::new();
    registry.mark_as_blocking("app::Io", "read", "*").unwrap();
    registry
        .unmark_as_blocking("app::Io", "read", "(Nonblocking)")
        .unwrap();
    let frozen = registry.freeze();

    assert!(frozen.is_blocking("app::Io", "read", "(u64)"));
    assert!(!frozen.is_blocking("app::Io", "read", "(Nonblocking)"));
    assert_eq!(frozen.blocking_len(), 2);
    assert_eq!(frozen.blocking_keys().count(), 1);
}

#[test]
fn test_defaults_are_loaded() {
    let frozen = Registry::with_defaults().freeze();
    assert!(frozen.is_blocking("std::thread", "sleep", "(Duration)"));
    assert!(frozen.is_blocking("std::net::TcpListener", "accept", "()"));
    assert!(frozen.guards_owner("std::fs"));
}

#[test]
fn test_invalid_keys_are_rejected() {
    let mut registry = Registry::new();
    let err = registry.mark_as_blocking("", "read", "*").unwrap_err();
    assert!(matches!(err, RegistryError::InvalidKey { .. }));
    assert!(registry.allow("app::Io", "", "*").is_err());
    assert_eq!(registry.blocking_len(), 0);
    assert_eq!(registry.directive_len(), 0);
}

// =============================================================================
// Scope Directives
// =============================================================================

#[test]
fn test_directive_last_write_wins() {
    let mut registry = Registry::new();
    registry.allow("app::Worker", "run", "*").unwrap();
    registry.disallow("app::Worker", "run", "*").unwrap();
    assert_eq!(registry.directive_len(), 1);

    let frozen = registry.freeze();
    assert_eq!(frozen.directive("app::Worker", "run", "()"), Some(false));
}

#[test]
fn test_set_directive_returns_previous() {
    let mut registry = Registry::new();
    let key = crate::OperationKey::new("app::Worker", "run", "*").unwrap();
    assert_eq!(registry.set_directive(key.clone(), true), None);
    assert_eq!(registry.set_directive(key, false), Some(true));
}

#[test]
fn test_exact_directive_overrides_wildcard() {
    let mut registry = Registry::new();
    registry.disallow("app::Worker", "run", "*").unwrap();
    registry.allow("app::Worker", "run", "(Batch)").unwrap();
    let frozen = registry.freeze();

    assert_eq!(frozen.directive("app::Worker", "run", "(Batch)"), Some(true));
    assert_eq!(frozen.directive("app::Worker", "run", "(Job)"), Some(false));
    assert_eq!(frozen.directive("app::Worker", "stop", "()"), None);
}

#[test]
fn test_exact_directive_applies_regardless_of_write_order() {
    let mut registry = Registry::new();
    registry.allow("app::Worker", "run", "(Batch)").unwrap();
    registry.disallow("app::Worker", "run", "*").unwrap();
    let frozen = registry.freeze();

    assert_eq!(frozen.directive("app::Worker", "run", "(Batch)"), Some(true));
}

#[test]
fn test_static_initializer_directive() {
    let mut registry = Registry::new();
    registry
        .allow("app::Config", STATIC_INITIALIZER, "*")
        .unwrap();
    let frozen = registry.freeze();

    assert_eq!(
        frozen.directive("app::Config", STATIC_INITIALIZER, "*"),
        Some(true)
    );
    assert_eq!(frozen.directive("app::Config", "load", "*"), None);
    assert!(frozen.guards_owner("app::Config"));
    assert!(!frozen.is_blocking("app::Config", STATIC_INITIALIZER, "*"));
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn test_snapshot_is_sorted_and_complete() {
    let mut registry = Registry::new();
    registry.mark_as_blocking("b::B", "op", "*").unwrap();
    registry.mark_as_blocking("a::A", "op", "(u8)").unwrap();
    registry.mark_as_blocking("a::A", "op", "*").unwrap();
    registry.allow("c::C", "frame", "*").unwrap();

    let snapshot = registry.freeze().snapshot();
    let owners: Vec<_> = snapshot
        .blocking
        .iter()
        .map(|entry| (entry.key.owner.as_str(), entry.key.signature.clone()))
        .collect();
    assert_eq!(
        owners,
        vec![
            ("a::A", Signature::Any),
            ("a::A", Signature::Exact("(u8)".to_string())),
            ("b::B", Signature::Any),
        ]
    );
    assert_eq!(snapshot.directives.len(), 1);
    assert!(snapshot.directives[0].allowed);
}

#[test]
fn test_snapshot_json_shape() {
    let mut registry = Registry::new();
    registry.allow("app::Worker", "run", "*").unwrap();
    let snapshot = registry.freeze().snapshot();

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "blocking": [],
            "directives": [
                { "owner": "app::Worker", "name": "run", "signature": "*", "allowed": true }
            ]
        })
    );
}
