//! Cloud Sweep CLI
//!
//! Finds idle cache clusters and database instances across regions,
//! estimates what they cost, and deletes the ones the operator selects.

mod commands;
mod config;
mod output;
mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::clean::CleanArgs;
use commands::{clean, scan, GlobalOptions};
use std::path::PathBuf;
use sweep_lib::ResourceKind;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cloud Sweep CLI
#[derive(Parser)]
#[command(name = "sweep")]
#[command(author, version, about = "Find and remove idle cloud resources", long_about = None)]
pub struct Cli {
    /// Named credential profile (can also be set via SWEEP_PROFILE env var)
    #[arg(long, global = true, env = "SWEEP_PROFILE")]
    pub profile: Option<String>,

    /// Account document to read instead of the profile's default
    #[arg(long, global = true)]
    pub account_file: Option<PathBuf>,

    /// Resource kind (cache-cluster or db-instance)
    #[arg(long, short, global = true)]
    pub kind: Option<ResourceKind>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe regions and list resources with cost and risk
    Scan,

    /// Select resources and delete them
    Clean(CleanArgs),
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });

    let json = (format == LogFormat::Json).then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text = (format == LogFormat::Text).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(run(cli));

    // A prompt interrupted by Ctrl-C leaves its stdin reader blocked; do not
    // wait for it
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    // Flags win over saved settings
    let settings = config::Settings::load()?;
    let kind = match cli.kind {
        Some(kind) => kind,
        None => match settings.default_kind.as_deref() {
            Some(saved) => saved.parse().map_err(anyhow::Error::msg)?,
            None => ResourceKind::CacheCluster,
        },
    };
    let format = match cli.format {
        Some(format) => format,
        None => match settings.default_format.as_deref() {
            Some(saved) => saved.parse().map_err(anyhow::Error::msg)?,
            None => output::OutputFormat::default(),
        },
    };

    let options = GlobalOptions {
        profile: cli.profile.or(settings.default_profile),
        account_file: cli.account_file,
        kind,
        format,
    };

    match cli.command {
        Commands::Scan => scan::run(&options).await?,
        Commands::Clean(args) => clean::run(&options, args).await?,
    }

    Ok(())
}
