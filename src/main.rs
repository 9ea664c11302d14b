//! Plugload - runtime plugin loader for a genome browser host.
//!
//! Loads the plugins declared in the configuration and reports what they
//! contribute.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use plugload::plugin::{
    install_global_capabilities, loader_from_config, ElementKind, GlobalScope, LoadedPlugin,
    PluginManager, PluginRecord, ProtocolPolicy, ProtocolValidator,
};
use plugload::Config;

/// Runtime plugin loader for a genome browser host
#[derive(Parser)]
#[command(name = "plugload")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file to use instead of the default lookup
    #[arg(long, global = true, env = "PLUGLOAD_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every configured plugin
    Load {
        /// Keep loading after a failure and report each outcome
        #[arg(short, long)]
        keep_going: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate plugin URLs without fetching them
    Check {
        /// URLs to check
        #[arg(required = true)]
        urls: Vec<String>,

        /// Resolve URLs without a scheme against --base
        #[arg(long)]
        allow_schemeless: bool,

        /// Base URL for scheme-less URLs
        #[arg(long, requires = "allow_schemeless")]
        base: Option<String>,
    },

    /// List the host capability modules exposed to plugins
    Exports,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        Commands::Load { keep_going, format } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_load(&config, keep_going, format)?;
        }
        Commands::Check { urls, allow_schemeless, base } => {
            cmd_check(&urls, allow_schemeless, base.as_deref())?;
        }
        Commands::Exports => {
            cmd_exports();
        }
        Commands::Config { path } => {
            cmd_config(cli.config.as_deref(), path)?;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}

/// Load the explicit config file, or fall back to the default lookup.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
}

#[derive(Serialize)]
struct PluginSummary<'a> {
    name: &'a str,
    version: &'a str,
    url: &'a str,
    elements: Vec<ElementSummary>,
}

#[derive(Serialize)]
struct ElementSummary {
    kind: ElementKind,
    name: String,
}

#[derive(Serialize)]
struct FailureSummary {
    plugin: String,
    url: String,
    error: String,
}

#[derive(Serialize)]
struct LoadReport<'a> {
    loaded: Vec<PluginSummary<'a>>,
    failed: Vec<FailureSummary>,
}

impl<'a> From<&'a LoadedPlugin> for PluginSummary<'a> {
    fn from(plugin: &'a LoadedPlugin) -> Self {
        let elements = plugin
            .instance
            .element_types()
            .into_iter()
            .map(|element| ElementSummary { kind: element.kind, name: element.name })
            .collect();

        Self {
            name: plugin.name(),
            version: plugin.version(),
            url: &plugin.definition.url,
            elements,
        }
    }
}

/// Load the configured plugins.
fn cmd_load(config: &Config, keep_going: bool, format: OutputFormat) -> Result<()> {
    if config.plugins.is_empty() {
        if format == OutputFormat::Text {
            println!("No plugins configured");
        } else {
            let report = LoadReport { loaded: Vec::new(), failed: Vec::new() };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        return Ok(());
    }

    let scope = GlobalScope::shared();
    install_global_capabilities(&scope);
    let loader = loader_from_config(config, Arc::clone(&scope))?;

    let rt = tokio::runtime::Runtime::new()?;
    let mut manager = PluginManager::new();
    let mut failed = Vec::new();

    if keep_going {
        for settled in rt.block_on(loader.load_settled()) {
            let outcome = settled.result.and_then(|constructor| {
                let record = PluginRecord { constructor, definition: settled.definition.clone() };
                manager.register(&record).map(|_| ())
            });
            if let Err(e) = outcome {
                failed.push((settled.definition, e));
            }
        }
    } else {
        let records = rt.block_on(loader.load())?;
        manager.register_all(&records)?;
    }

    let report = LoadReport {
        loaded: manager.list().map(PluginSummary::from).collect(),
        failed: failed
            .iter()
            .map(|(definition, e)| FailureSummary {
                plugin: definition.display().to_string(),
                url: definition.url.clone(),
                error: e.to_string(),
            })
            .collect(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report, &manager),
    }

    if !report.failed.is_empty() {
        anyhow::bail!("{} of {} plugins failed to load", report.failed.len(), config.plugins.len());
    }

    Ok(())
}

fn print_report(report: &LoadReport<'_>, manager: &PluginManager) {
    for plugin in &report.loaded {
        println!("{} {} - {}", plugin.name, plugin.version, plugin.url);
    }
    for failure in &report.failed {
        eprintln!("failed {} - {}", failure.plugin, failure.error);
    }

    for kind in ElementKind::ALL {
        let elements = manager.elements_of(kind);
        if elements.is_empty() {
            continue;
        }
        println!("\n{kind}s:");
        for (element, plugin) in elements {
            println!("  {element} ({plugin})");
        }
    }

    println!("\nTotal: {} plugins", report.loaded.len());
}

/// Validate plugin URLs.
fn cmd_check(urls: &[String], allow_schemeless: bool, base: Option<&str>) -> Result<()> {
    let policy =
        if allow_schemeless { ProtocolPolicy::AllowSchemeless } else { ProtocolPolicy::Strict };
    let validator = ProtocolValidator::new(policy, base)?;

    let mut invalid = 0;
    for raw in urls {
        match validator.validate(raw) {
            Ok(url) => println!("ok {url}"),
            Err(e) => {
                invalid += 1;
                eprintln!("invalid {raw}: {e}");
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} of {} URLs rejected", urls.len());
    }

    Ok(())
}

/// List capability modules.
fn cmd_exports() {
    let scope = GlobalScope::new();
    install_global_capabilities(&scope);

    if let Some(bundle) = scope.exports() {
        for name in bundle.module_names() {
            println!("{name}");
        }
    }
}

/// Show configuration.
fn cmd_config(explicit: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        match explicit {
            Some(path) => println!("{}", path.display()),
            None => match Config::find_file() {
                Some(path) => println!("{}", path.display()),
                None => println!("No config file found; using defaults"),
            },
        }
        return Ok(());
    }

    let config = load_config(explicit)?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "plugload", &mut io::stdout());
}
