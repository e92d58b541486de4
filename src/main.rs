//! # Pricewatch — scheduled price monitors with email alerts
//!
//! Usage:
//!   pricewatch                         # Service mode: run until signaled
//!   pricewatch --mode single           # One pass over enabled scrapers
//!   pricewatch villa_del_arco          # Run one scraper once
//!   pricewatch --list                  # Show registered scrapers

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use pricewatch_core::config::ScheduleEntry;
use pricewatch_core::{PricewatchConfig, Runnable};
use pricewatch_health::HealthTracker;
use pricewatch_scrapers::{SCRAPER_NAMES, create_job};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Continuous scheduling until a shutdown signal
    Service,
    /// Run every enabled scraper once, then exit
    Single,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Service => write!(f, "service"),
            Mode::Single => write!(f, "single"),
        }
    }
}

#[derive(Parser)]
#[command(
    name = "pricewatch",
    version,
    about = "📈 Pricewatch — scheduled price monitors with email alerts"
)]
struct Cli {
    /// Run a single scraper once and exit (see --list for names)
    scraper: Option<String>,

    /// Run mode
    #[arg(long, value_enum, default_value_t = Mode::Service)]
    mode: Mode,

    /// Path to the config file (default: ~/.pricewatch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the health server port
    #[arg(long)]
    port: Option<u16>,

    /// List available scrapers and exit
    #[arg(short, long)]
    list: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug,hyper=info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if cli.list {
        println!("Available scrapers:");
        println!("  power_to_choose  - Electricity plan prices from Power to Choose");
        println!("  villa_del_arco   - Hotel prices from Villa del Arco");
        println!("  alaska_award     - Alaska Airlines award ticket availability");
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => PricewatchConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PricewatchConfig::load().context("loading config")?,
    };
    if let Some(port) = cli.port {
        config.service.health_port = port;
    }
    config.validate()?;

    if cli.show_config {
        print_config(&config)?;
        return Ok(());
    }

    // Single-task context: an unknown name is fatal.
    if let Some(name) = &cli.scraper {
        let job = create_job(name, &config)
            .with_context(|| format!("creating scraper '{name}' (try --list)"))?;
        tracing::info!("Running {name} scraper...");
        let job: Arc<dyn Runnable> = Arc::new(job);
        let ok = pricewatch_scheduler::run_scraper_safe(&job, &HealthTracker::new()).await;
        std::process::exit(if ok { 0 } else { 1 });
    }

    match cli.mode {
        Mode::Single => {
            let jobs: Vec<Arc<dyn Runnable>> = build_jobs(&config)
                .into_iter()
                .map(|(_, job)| job)
                .collect();
            let ok = pricewatch_scheduler::run_single_pass(&jobs).await;
            std::process::exit(if ok { 0 } else { 1 });
        }
        Mode::Service => {
            let jobs = build_jobs(&config);
            pricewatch_scheduler::run_service(&config, jobs).await?;
        }
    }

    Ok(())
}

/// Build jobs for every enabled registry entry. Batch context: a scraper
/// that fails to construct is logged and skipped, never fatal.
fn build_jobs(config: &PricewatchConfig) -> Vec<(ScheduleEntry, Arc<dyn Runnable>)> {
    let mut jobs = Vec::new();
    for name in SCRAPER_NAMES {
        let Some(entry) = config.schedule.entry(name) else {
            continue;
        };
        if !entry.enabled {
            tracing::info!("Scraper {name} is disabled");
            continue;
        }
        match create_job(name, config) {
            Ok(job) => jobs.push((*entry, Arc::new(job) as Arc<dyn Runnable>)),
            Err(e) => tracing::error!("Failed to create scraper {name}: {e}"),
        }
    }
    jobs
}

/// Print the effective configuration with credentials redacted.
fn print_config(config: &PricewatchConfig) -> anyhow::Result<()> {
    let mut sanitized = config.clone();
    if !sanitized.email.password.is_empty() {
        sanitized.email.password = "********".into();
    }
    println!("{}", toml::to_string_pretty(&sanitized)?);
    Ok(())
}
