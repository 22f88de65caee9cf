// Sluice command line interface
// Reads JSON requests from a file or stdin and writes JSON responses to stdout

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use sluice_core::{AnalysisRequest, EngineConfig, FilterGroup, FilterRequest};
use sluice_query::{AnalyticsEngine, FilterEngine, FilterOptimizer};
use std::io::{self, Read};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Sluice - message filtering and field analytics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON, TOML or YAML)
    #[arg(long, short, global = true)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Single-line JSON output
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter records: {records, filter} -> {kept, metrics}
    Filter {
        /// Request file, or - for stdin
        input: String,
    },

    /// Analyse records: {records, connectionId, existingStatistics?} -> statistics
    Analyze {
        /// Request file, or - for stdin
        input: String,
    },

    /// Optimise a filter group and report complexity and suggestions
    Optimize {
        /// Filter group file, or - for stdin
        input: String,
    },

    /// Validate a filter group; exits non-zero when it is malformed
    Validate {
        /// Filter group file, or - for stdin
        input: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "Loaded engine configuration");

    match cli.command {
        Commands::Filter { input } => {
            let request: FilterRequest = read_json(&input)?;
            let mut engine = FilterEngine::new(config)?;
            let response = engine.handle(request)?;
            write_json(&response, cli.compact)
        }
        Commands::Analyze { input } => {
            let request: AnalysisRequest = read_json(&input)?;
            let engine = AnalyticsEngine::new(config)?;
            let response = engine.analyze(&request)?;
            write_json(&response, cli.compact)
        }
        Commands::Optimize { input } => {
            let group: FilterGroup = read_json(&input)?;
            write_json(&FilterOptimizer::report(&group), cli.compact)
        }
        Commands::Validate { input } => {
            let group: FilterGroup = read_json(&input)?;
            group
                .validate(config.max_group_depth)
                .map_err(|e| anyhow!("Invalid filter '{}': {}", group.id, e))?;
            info!(filter = %group.id, "Filter is valid");
            write_json(
                &json!({
                    "valid": true,
                    "depth": group.depth(),
                    "conditions": group.all_conditions().len(),
                    "activeConditions": group.active_conditions().len(),
                }),
                cli.compact,
            )
        }
    }
}

fn init_logging(log_level: &str) -> anyhow::Result<()> {
    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&log_level) {
        return Err(anyhow!("Invalid log level: {}", log_level));
    }

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

/// File (or defaults), then `SLUICE_*` environment overrides, then validation.
fn load_config(path: Option<&str>) -> anyhow::Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(input: &str) -> anyhow::Result<T> {
    let content = if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?
    };

    serde_json::from_str(&content).with_context(|| format!("Malformed JSON in {}", input))
}

fn write_json<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", text);
    Ok(())
}
