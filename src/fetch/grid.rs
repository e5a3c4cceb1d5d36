//! World Community Grid member results.
//!
//! The results endpoint lists recent work units across every BOINC project
//! the member crunches for. Results are folded per project here so the
//! aggregator only ever sees [`ProjectRecord`]s.

use super::{get_body, require_identity, FetchError, StatsFetcher};
use crate::models::{Platform, PlatformStats, PlatformSummary, ProjectRecord};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://www.worldcommunitygrid.org";
pub const DEFAULT_LIMIT: u32 = 250;

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    results: Option<Vec<WireResult>>,
    #[serde(default, rename = "ResultsStatus")]
    results_status: Option<ResultsStatus>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultsStatus {
    #[serde(default, rename = "Results")]
    results: Vec<WireResult>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(rename = "AppName")]
    app_name: String,
    // Older and newer payloads name the credit differently; some carry several.
    #[serde(default)]
    points: Option<f64>,
    #[serde(default, rename = "Points")]
    points_upper: Option<f64>,
    #[serde(default, rename = "GrantedCredit")]
    granted_credit: Option<f64>,
    #[serde(default, rename = "CpuTime")]
    cpu_time: f64,
    #[serde(rename = "ReceivedTime")]
    received_time: String,
}

impl WireResult {
    fn credit(&self) -> f64 {
        self.points
            .or(self.points_upper)
            .or(self.granted_credit)
            .unwrap_or(0.0)
    }
}

/// Fetcher for one World Community Grid member.
pub struct GridFetcher {
    client: reqwest::Client,
    base_url: String,
    member: String,
    verification_code: String,
    limit: u32,
}

impl GridFetcher {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        member: &str,
        verification_code: &str,
        limit: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            member: member.to_string(),
            verification_code: verification_code.to_string(),
            limit,
        }
    }

    fn results_url(&self, member: &str, code: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Network(format!("invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "members", member, "results"]);
        url.query_pairs_mut()
            .append_pair("code", code)
            .append_pair("format", "json")
            .append_pair("limit", &self.limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl StatsFetcher for GridFetcher {
    fn platform(&self) -> Platform {
        Platform::WorldCommunityGrid
    }

    async fn fetch(&self) -> Result<PlatformStats, FetchError> {
        let member = require_identity(&self.member, "World Community Grid member name")?;
        let code = require_identity(&self.verification_code, "verification code")?;
        let url = self.results_url(member, code)?;

        info!("Fetching World Community Grid results for: {}", member);
        // The query string carries the verification code.
        debug!("GET {}", url.path());

        let body = get_body(self.client.get(url), "World Community Grid results").await?;
        parse_results(&body, Utc::now())
    }
}

/// Convert a results body into a summary and per-project records.
fn parse_results(body: &str, fetched_at: DateTime<Utc>) -> Result<PlatformStats, FetchError> {
    let response: ResultsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    if let Some(error) = response.error {
        let lowered = error.to_lowercase();
        return Err(if lowered.contains("not found") || lowered.contains("unknown") {
            FetchError::NotFound(error)
        } else {
            FetchError::Auth(error)
        });
    }

    let results = match (response.results, response.results_status) {
        (Some(results), _) => results,
        (None, Some(status)) => status.results,
        (None, None) => return Err(FetchError::Parse("missing results list".to_string())),
    };

    let mut by_project: BTreeMap<String, (u64, NaiveDate)> = BTreeMap::new();
    let mut total_points = 0u64;
    let mut total_cpu = 0u64;

    for result in &results {
        let received = parse_received_date(&result.received_time)?;
        let points = to_whole(result.credit(), "points")?;

        total_points = add_checked(total_points, points, "points")?;
        total_cpu = add_checked(total_cpu, to_whole(result.cpu_time, "CpuTime")?, "CpuTime")?;

        let entry = by_project
            .entry(result.app_name.clone())
            .or_insert((0, received));
        entry.0 = add_checked(entry.0, points, &result.app_name)?;
        if received < entry.1 {
            entry.1 = received;
        }
    }

    debug!(
        "Folded {} results into {} projects",
        results.len(),
        by_project.len()
    );

    let projects = by_project
        .into_iter()
        .map(|(name, (credits, member_since))| ProjectRecord {
            name,
            credits,
            member_since,
            source: Platform::WorldCommunityGrid,
        })
        .collect();

    Ok(PlatformStats {
        platform: Platform::WorldCommunityGrid,
        summary: PlatformSummary {
            points: total_points,
            work_units: results.len() as u64,
            rank: None,
            fetched_at,
            contributors: None,
            cpu_seconds: Some(total_cpu),
        },
        projects,
    })
}

fn parse_received_date(value: &str) -> Result<NaiveDate, FetchError> {
    let date = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| FetchError::Parse(format!("bad ReceivedTime {:?}: {}", value, e)))
}

fn to_whole(value: f64, field: &str) -> Result<u64, FetchError> {
    if !value.is_finite() || value < 0.0 {
        return Err(FetchError::Parse(format!("invalid {}: {}", field, value)));
    }
    Ok(value.round() as u64)
}

fn add_checked(total: u64, value: u64, field: &str) -> Result<u64, FetchError> {
    total
        .checked_add(value)
        .ok_or_else(|| FetchError::Parse(format!("{} total overflows", field)))
}
