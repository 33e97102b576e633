//! # Core Tests
//!
//! Extension ordering, discovery and builder behavior. Nothing here
//! installs; installation is covered by the `tests/` integration files.

use crate::{
    discover_extensions, order_extensions, Builder, Extension, ExtensionCatalog,
    StallguardConfig, StallguardError, MANIFEST_RULES,
};
use stallguard_registry::STATIC_INITIALIZER;
use std::sync::{Arc, Mutex};

/// Records its name into a shared log when applied.
struct Named {
    name: &'static str,
    priority: i32,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Extension for Named {
    fn apply_to(&self, _builder: &mut Builder) {
        self.log.lock().unwrap().push(self.name);
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn named(
    name: &'static str,
    priority: i32,
    log: &Arc<Mutex<Vec<&'static str>>>,
) -> Box<dyn Extension> {
    Box::new(Named {
        name,
        priority,
        log: log.clone(),
    })
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_discovered_and_explicit_merge_by_stable_priority() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let discovered = vec![named("Second", 0, &log), named("First", -1, &log)];
    let explicit = vec![
        named("Fourth", 2, &log),
        named("Third", 1, &log),
        named("Fifth", 0, &log),
        named("Sixth", 0, &log),
    ];

    let mut builder = Builder::new();
    for extension in order_extensions(discovered, explicit) {
        builder.apply(extension.as_ref());
    }

    assert_eq!(
        *log.lock().unwrap(),
        vec!["First", "Second", "Fifth", "Sixth", "Third", "Fourth"]
    );
}

#[test]
fn test_order_with_no_extensions() {
    assert!(order_extensions(Vec::new(), Vec::new()).is_empty());
}

#[test]
fn test_closure_extension_defaults() {
    let closure = |builder: &mut Builder| {
        builder.mark_as_blocking("app::Db", "query", "*");
    };
    assert_eq!(closure.priority(), 0);
    assert_eq!(Extension::name(&closure), "closure");

    let mut builder = Builder::new();
    builder.with(closure);
    assert!(builder.registry.clone().freeze().is_blocking("app::Db", "query", "()"));
}

// =============================================================================
// Catalog and Discovery
// =============================================================================

#[test]
fn test_builtin_catalog() {
    let catalog = ExtensionCatalog::with_builtins();
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["tokio"]);
    let extension = catalog
        .resolve("tokio", &StallguardConfig::default())
        .unwrap();
    assert_eq!(extension.name(), "tokio");
}

#[test]
fn test_unknown_extension_is_rejected() {
    let catalog = ExtensionCatalog::with_builtins();
    let err = catalog
        .resolve("reactor", &StallguardConfig::default())
        .err()
        .unwrap();
    match err {
        StallguardError::UnknownExtension { name, known } => {
            assert_eq!(name, "reactor");
            assert_eq!(known, "tokio");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_manifest_lists_extensions_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut catalog = ExtensionCatalog::new();
    for name in ["alpha", "beta"] {
        let log = log.clone();
        catalog.register(name, move |_| {
            Box::new(Named {
                name,
                priority: 0,
                log: log.clone(),
            }) as Box<dyn Extension>
        });
    }

    let config = StallguardConfig::from_toml_str(
        r#"
        [[extensions]]
        name = "beta"

        [[extensions]]
        name = "alpha"

        [[allow]]
        owner = "app::Cache"
        name = "warm"
        "#,
    )
    .unwrap();

    let names: Vec<_> = discover_extensions(&config, &catalog)
        .unwrap()
        .iter()
        .map(|e| e.name().to_string())
        .collect();
    assert_eq!(names, vec!["beta", "alpha", MANIFEST_RULES]);
}

#[test]
fn test_missing_extensions_section_discovers_whole_catalog() {
    let catalog = ExtensionCatalog::with_builtins();
    let discovered = discover_extensions(&StallguardConfig::default(), &catalog).unwrap();
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].name(), "tokio");
}

#[test]
fn test_manifest_rules_reach_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stallguard.toml");
    std::fs::write(
        &path,
        r#"
        extensions = []

        [[blocking]]
        owner = "app::Db"
        name = "query"

        [[allow]]
        owner = "app::Db"
        name = "migrate"

        [[disallow]]
        owner = "app::Loop"
        name = "tick"
        signature = "(u64)"
        "#,
    )
    .unwrap();

    let config = StallguardConfig::load(&path).unwrap();
    let mut builder = Builder::from_config(config.clone());
    for extension in discover_extensions(&config, &ExtensionCatalog::with_builtins()).unwrap() {
        builder.apply(extension.as_ref());
    }

    let plan = builder.registry.clone().freeze();
    assert!(plan.is_blocking("app::Db", "query", "(String)"));
    assert_eq!(plan.directive("app::Db", "migrate", "()"), Some(true));
    assert_eq!(plan.directive("app::Loop", "tick", "(u64)"), Some(false));
    assert_eq!(plan.directive("app::Loop", "tick", "()"), None);
}

#[test]
fn test_unreadable_manifest_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    match StallguardConfig::load(&path) {
        Err(StallguardError::Manifest { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
}

// =============================================================================
// Builder
// =============================================================================

#[test]
fn test_builder_starts_from_defaults() {
    let plan = Builder::new().registry.freeze();
    assert!(plan.is_blocking("std::thread", "sleep", "(Duration)"));
}

#[test]
fn test_invalid_registration_is_deferred() {
    let mut builder = Builder::new();
    builder
        .mark_as_blocking("", "query", "*")
        .allow_blocking_calls_inside("app::Db", "");
    assert_eq!(builder.errors.len(), 2);
}

#[test]
fn test_allow_spec_registers_methods_and_initializer() {
    let mut builder = Builder::new();
    builder
        .allow_blocking_calls_inside_type("app::Config")
        .for_methods(["reload", "persist"])
        .for_static_initializer()
        .and()
        .disallow_blocking_calls_inside("app::Config", "persist");

    let plan = builder.registry.clone().freeze();
    assert_eq!(plan.directive("app::Config", "reload", "()"), Some(true));
    assert_eq!(plan.directive("app::Config", "persist", "()"), Some(false));
    assert_eq!(
        plan.directive("app::Config", STATIC_INITIALIZER, "*"),
        Some(true)
    );
}

#[test]
fn test_unmark_exempts_one_overload() {
    let mut builder = Builder::new();
    builder
        .mark_as_blocking("app::Io", "read", "*")
        .unmark_as_blocking("app::Io", "read", "(Nonblocking)");
    let plan = builder.registry.clone().freeze();
    assert!(plan.is_blocking("app::Io", "read", "(Blocking)"));
    assert!(!plan.is_blocking("app::Io", "read", "(Nonblocking)"));
}

#[test]
fn test_reporting_mode_serializes_lowercase() {
    use crate::ReportingMode;

    assert_eq!(
        serde_json::to_value(ReportingMode::Log).unwrap(),
        serde_json::json!("log")
    );
    let config = StallguardConfig::default().with_reporting_mode(ReportingMode::Ignore);
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["reporting"]["mode"], "ignore");
    assert_eq!(json["install"]["self_test"], true);
}
