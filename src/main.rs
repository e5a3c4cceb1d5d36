//! crunchstats - living README for volunteer computing stats
//!
//! Fetches Folding@home and World Community Grid statistics, rewrites
//! the marked region of a README and writes a JSON snapshot next to it.
//!
//! Exit codes:
//!   0 - Success, including runs where a platform was unavailable
//!   1 - Runtime error (config, missing markers, unwritable output, etc.)

mod analysis;
mod cli;
mod config;
mod fetch;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use models::Platform;
use pipeline::{RunOptions, RunReport};
use report::generator::group_thousands;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("crunchstats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .crunchstats.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Set your donor names there or via FAH_USERNAME / WCG_MEMBER_NAME.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one update. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let client = fetch::build_client(config.general.timeout_seconds)?;
    let (fetchers, skipped) = pipeline::build_fetchers(&config, &client);

    println!("📡 Fetching stats from {} platform(s)...", fetchers.len());

    let options = RunOptions {
        dry_run: args.dry_run,
        create_missing: args.create_missing,
    };
    let report = pipeline::run_pipeline(&fetchers, &skipped, &config, options, Utc::now()).await?;

    if !report.written {
        println!("\n🔍 Dry run: section that would be written\n");
        println!("{}", report.section);
        println!("✅ Dry run complete. No files were written.");
        return Ok(0);
    }

    print_summary(&report, &config, start_time.elapsed().as_secs_f64());
    Ok(0)
}

fn print_summary(report: &RunReport, config: &Config, duration: f64) {
    let snapshot = &report.snapshot;

    println!("\n📊 Run Summary:");
    for platform in Platform::ALL {
        match snapshot.platform(platform) {
            Some(summary) => {
                let rank = summary
                    .rank
                    .map(|r| format!(", rank #{}", group_thousands(r)))
                    .unwrap_or_default();
                println!(
                    "   {} {}: {} points, {} work units{}",
                    platform.emoji(),
                    platform,
                    group_thousands(summary.points),
                    group_thousands(summary.work_units),
                    rank
                );
            }
            None => println!("   ⚠️  {}: unavailable", platform),
        }
    }
    println!(
        "   Projects: {} ({} credits)",
        snapshot.projects().len(),
        group_thousands(snapshot.total_credits())
    );
    println!("   Years active: {:.1}", snapshot.years_active());
    if !snapshot.unavailable_projects().is_empty() {
        println!(
            "   Not included: {}",
            snapshot.unavailable_projects().join(", ")
        );
    }
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Updated {} and {}",
        config.output.readme.display(),
        config.output.json.display()
    );
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
