//! Stallguard CLI - inspect blocking-call detection settings

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use stallguard_core::{
    discover_extensions, order_extensions, ExtensionCatalog, OperationRule, ReportingMode,
    StallguardConfig, DEFAULT_MANIFEST,
};
use stallguard_registry::Registry;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "stallguard")]
#[command(about = "Stallguard - blocking-call detection for non-blocking threads")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print the built-in blocking operations as JSON
    Defaults,
    /// Validate a manifest and print the resolved extension order
    Check {
        /// Manifest path
        #[arg(short, long, default_value = DEFAULT_MANIFEST)]
        config: PathBuf,
    },
    /// Install with discovered extensions and run the self-test
    SelfTest,
}

#[derive(Serialize)]
struct CheckReport {
    manifest: PathBuf,
    reporting: ReportingMode,
    self_test: bool,
    extensions: Vec<ExtensionLine>,
    blocking: usize,
    directives: usize,
}

#[derive(Serialize)]
struct ExtensionLine {
    name: String,
    priority: i32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Defaults) => {
            let snapshot = Registry::with_defaults().freeze().snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Some(Commands::Check { config }) => {
            let report = check(config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Commands::SelfTest) => {
            let installation = stallguard_core::install(Vec::new())
                .context("installation failed")?;
            match installation.report() {
                Some(report) => {
                    info!("Self-test passed");
                    println!("{}", serde_json::to_string_pretty(report)?);
                }
                None => println!("Stallguard was already installed"),
            }
        }
        None => {
            println!("Stallguard v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn check(path: PathBuf) -> anyhow::Result<CheckReport> {
    let config = StallguardConfig::load(&path)?;
    let discovered = discover_extensions(&config, &ExtensionCatalog::with_builtins())?;
    let extensions = order_extensions(discovered, Vec::new())
        .iter()
        .map(|extension| ExtensionLine {
            name: extension.name().to_string(),
            priority: extension.priority(),
        })
        .collect();

    let mut registry = Registry::with_defaults();
    for rule in &config.blocking {
        registry
            .mark_as_blocking(&rule.owner, &rule.name, rule.signature.as_str())
            .with_context(|| describe("blocking", rule))?;
    }
    for rule in &config.allow {
        registry
            .allow(&rule.owner, &rule.name, rule.signature.as_str())
            .with_context(|| describe("allow", rule))?;
    }
    for rule in &config.disallow {
        registry
            .disallow(&rule.owner, &rule.name, rule.signature.as_str())
            .with_context(|| describe("disallow", rule))?;
    }

    Ok(CheckReport {
        manifest: path,
        reporting: config.reporting.mode,
        self_test: config.install.self_test,
        extensions,
        blocking: registry.blocking_len(),
        directives: registry.directive_len(),
    })
}

fn describe(section: &str, rule: &OperationRule) -> String {
    format!("invalid [[{section}]] rule {}::{}", rule.owner, rule.name)
}
