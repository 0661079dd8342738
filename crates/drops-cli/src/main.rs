//! dropsctl
//!
//! Drive a simulated drops runtime from a scenario file, or recompute epoch
//! entropy, token values and token ids offline.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use drops_cli::scenario::{Scenario, ScenarioRunner};
use drops_cli::verify;
use drops_core::DropsConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dropsctl")]
#[command(about = "Drops - epoch entropy and capacity-backed tokens", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON scenario against a simulated runtime
    Run {
        /// Scenario file
        scenario: PathBuf,

        /// Stop at the first failed step
        #[arg(long)]
        fail_fast: bool,

        /// Exit with an error if any step failed
        #[arg(long)]
        strict: bool,

        /// Pretty-print reports
        #[arg(long)]
        pretty: bool,
    },

    /// Digest an oracle commits to for a payload
    Commitment {
        payload: String,
    },

    /// Entropy of an epoch from its reveal payloads
    Entropy {
        /// Epoch number
        #[arg(short, long)]
        epoch: u64,

        /// Revealed payloads, in any order
        #[arg(required = true)]
        payloads: Vec<String>,
    },

    /// Derived value of a token under an epoch's entropy
    ItemValue {
        /// Hex-encoded epoch entropy
        #[arg(short, long)]
        entropy: String,

        /// Token id
        #[arg(short, long)]
        token: u64,
    },

    /// Token ids minted from a seed
    TokenIds {
        #[arg(short, long)]
        seed: String,

        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            scenario,
            fail_fast,
            strict,
            pretty,
        } => run_scenario(config, &scenario, fail_fast, strict, pretty)?,

        Commands::Commitment { payload } => {
            println!("{}", verify::commitment(&payload));
        }

        Commands::Entropy { epoch, payloads } => {
            println!("{}", verify::epoch_entropy(epoch, &payloads));
        }

        Commands::ItemValue { entropy, token } => {
            println!("{}", verify::token_value(&entropy, token)?);
        }

        Commands::TokenIds { seed, count } => {
            for derived in verify::token_ids(&seed, count) {
                print_json(&derived, false)?;
            }
        }

        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
            print!("{rendered}");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DropsConfig> {
    match path {
        Some(path) => {
            let config = DropsConfig::load(path)?;
            info!(path = %path.display(), "Loaded configuration");
            Ok(config)
        }
        None => Ok(DropsConfig::default()),
    }
}

fn run_scenario(
    config: DropsConfig,
    path: &Path,
    fail_fast: bool,
    strict: bool,
    pretty: bool,
) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let mut runner = ScenarioRunner::new(config, &scenario)?;
    let reports = runner.run(&scenario, fail_fast)?;

    for report in &reports {
        print_json(report, pretty)?;
    }
    print_json(&runner.summary(), pretty)?;

    let failed = reports.iter().filter(|r| !r.outcome.is_ok()).count();
    info!(steps = reports.len(), failed, "Scenario finished");
    if strict && failed > 0 {
        bail!("{failed} of {} steps failed", reports.len());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}
