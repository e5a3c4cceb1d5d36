//! One run of the fetch → aggregate → render → splice flow.
//!
//! Everything is rendered in memory first. Files are only touched once
//! both outputs exist, so a template error leaves the README untouched.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

use crate::analysis::{aggregate, credit_regressions, load_previous};
use crate::config::Config;
use crate::fetch::{fetch_all, FetchError, FoldingFetcher, GridFetcher, StatsFetcher};
use crate::models::{AggregateSnapshot, Platform};
use crate::report::{
    bootstrap_document, generate_json_snapshot, generate_markdown_section, splice, write_atomic,
};

/// Switches that change what a run writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub create_missing: bool,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub snapshot: AggregateSnapshot,
    /// Markdown placed between the markers.
    pub section: String,
    /// False for dry runs.
    pub written: bool,
}

/// Fetchers for every configured platform, plus the platforms left out.
pub fn build_fetchers(
    config: &Config,
    client: &reqwest::Client,
) -> (Vec<Box<dyn StatsFetcher>>, Vec<Platform>) {
    let mut fetchers: Vec<Box<dyn StatsFetcher>> = Vec::new();
    let mut skipped = Vec::new();

    match config.folding.username {
        Some(ref username) => fetchers.push(Box::new(FoldingFetcher::new(
            client.clone(),
            &config.folding.base_url,
            username,
        ))),
        None => {
            warn!("Folding@home username not set (FAH_USERNAME)");
            skipped.push(Platform::FoldingAtHome);
        }
    }

    match (&config.grid.member, &config.grid.verification_code) {
        (Some(member), Some(code)) => fetchers.push(Box::new(GridFetcher::new(
            client.clone(),
            &config.grid.base_url,
            member,
            code,
            config.grid.limit,
        ))),
        _ => {
            warn!("World Community Grid credentials not set (WCG_MEMBER_NAME, WCG_VERIFICATION_CODE)");
            skipped.push(Platform::WorldCommunityGrid);
        }
    }

    (fetchers, skipped)
}

/// Execute a full run.
pub async fn run_pipeline(
    fetchers: &[Box<dyn StatsFetcher>],
    skipped: &[Platform],
    config: &Config,
    options: RunOptions,
    now: DateTime<Utc>,
) -> Result<RunReport> {
    let mut outcomes = fetch_all(fetchers).await;
    outcomes.extend(
        skipped
            .iter()
            .map(|&p| (p, Err(FetchError::Auth("no identity configured".to_string())))),
    );

    let snapshot = aggregate(
        outcomes,
        &config.grid.projects,
        config.general.start_date,
        now,
    );

    let section = generate_markdown_section(&snapshot, &config.identities());
    let json = generate_json_snapshot(&snapshot)?;

    if options.dry_run {
        return Ok(RunReport {
            snapshot,
            section,
            written: false,
        });
    }

    let readme_path = &config.output.readme;
    let template = read_template(readme_path, config, options.create_missing)?;
    let readme = splice(&template, &config.markers(), &section)
        .with_context(|| format!("Cannot update {}", readme_path.display()))?;

    if let Some(previous) = load_previous(&config.output.json) {
        for r in credit_regressions(&previous, &snapshot) {
            warn!(
                "{} ({}) credits dropped from {} to {}",
                r.name, r.source, r.previous, r.current
            );
        }
    }

    write_atomic(readme_path, &readme)?;
    info!("Updated {}", readme_path.display());
    write_atomic(&config.output.json, &json)?;
    info!("Wrote snapshot {}", config.output.json.display());

    Ok(RunReport {
        snapshot,
        section,
        written: true,
    })
}

fn read_template(path: &Path, config: &Config, create_missing: bool) -> Result<String> {
    if create_missing && !path.exists() {
        info!("{} not found, creating it", path.display());
        return Ok(bootstrap_document(
            &config.output.begin_marker,
            &config.output.end_marker,
        ));
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
