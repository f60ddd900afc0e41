//! Outbreak CLI
//!
//! Runs the parasitosis outbreak engine over a JSON dataset, generates
//! synthetic datasets and checks configuration files.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "outbreak")]
#[command(about = "Parasitosis outbreak detection over geolocated lab results")]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run outbreak analysis over a dataset
    Analyze {
        /// Dataset JSON (cases, tests, baselines, municipalities)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Engine configuration TOML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// End of the analysis window (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Append notifications to this JSONL outbox instead of logging them
        #[arg(long)]
        outbox: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate a synthetic dataset
    Synth {
        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,

        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Cases in the dense cluster
        #[arg(long, default_value = "10")]
        cluster_cases: usize,

        /// Background cases scattered around the city
        #[arg(long, default_value = "50")]
        scattered_cases: usize,

        /// Geolocated tests (rate denominator)
        #[arg(long, default_value = "1000")]
        tests: usize,

        /// End of the generated period (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Date the baseline this many years before --now; match the
        /// validation.baseline_lag_years used by analyze
        #[arg(long, default_value = "0")]
        baseline_lag_years: u32,
    },

    /// Load, validate and print the effective configuration
    CheckConfig {
        /// Engine configuration TOML (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            dataset,
            config,
            now,
            outbox,
            format,
        } => {
            if format == OutputFormat::Text {
                banner();
            }
            commands::analyze(
                &dataset,
                config.as_deref(),
                now.as_deref(),
                outbox.as_deref(),
                format,
            )
            .await
        }

        Commands::Synth {
            output,
            seed,
            cluster_cases,
            scattered_cases,
            tests,
            now,
            baseline_lag_years,
        } => {
            banner();
            commands::synth(
                &output,
                seed,
                cluster_cases,
                scattered_cases,
                tests,
                now.as_deref(),
                baseline_lag_years,
            )
        }

        Commands::CheckConfig { config } => {
            banner();
            commands::check_config(config.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn banner() {
    println!("{}", "═".repeat(60).cyan());
    println!("{}", "  PARASITOSIS OUTBREAK DETECTION".cyan().bold());
    println!("{}", "  Spatial clustering of eosinophilia cases".cyan());
    println!("{}", "═".repeat(60).cyan());
    println!();
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
