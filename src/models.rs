//! Data models for the stats pipeline.
//!
//! This module contains the normalized records produced by the fetchers
//! and the immutable snapshot handed to the renderers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An upstream volunteer-computing statistics source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Folding@home protein folding stats.
    FoldingAtHome,
    /// World Community Grid (BOINC) member results.
    WorldCommunityGrid,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::FoldingAtHome => write!(f, "Folding@home"),
            Platform::WorldCommunityGrid => write!(f, "World Community Grid"),
        }
    }
}

impl Platform {
    /// All platforms in rendering order.
    pub const ALL: [Platform; 2] = [Platform::FoldingAtHome, Platform::WorldCommunityGrid];

    /// Returns an emoji representation of the platform.
    pub fn emoji(&self) -> &'static str {
        match self {
            Platform::FoldingAtHome => "💻",
            Platform::WorldCommunityGrid => "🌍",
        }
    }

    /// Whether the platform's fetcher produces per-project records.
    pub fn reports_projects(&self) -> bool {
        matches!(self, Platform::WorldCommunityGrid)
    }
}

/// One tracked project and its credit total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project name as reported upstream.
    pub name: String,
    /// Credits earned on this project.
    pub credits: u64,
    /// Earliest date a contribution to this project was recorded.
    pub member_since: NaiveDate,
    /// Platform the project belongs to.
    pub source: Platform,
}

/// Headline numbers for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSummary {
    /// Points (or credits) earned on the platform.
    pub points: u64,
    /// Completed work units / results.
    pub work_units: u64,
    /// Global rank, when the platform publishes one.
    pub rank: Option<u64>,
    /// When the numbers were fetched.
    pub fetched_at: DateTime<Utc>,
    /// Number of ranked contributors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributors: Option<u64>,
    /// Summed CPU time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_seconds: Option<u64>,
}

impl PlatformSummary {
    /// Rank as a percentage of all contributors ("top N%").
    pub fn top_percent(&self) -> Option<f64> {
        match (self.rank, self.contributors) {
            (Some(rank), Some(total)) if total > 0 => Some(rank as f64 / total as f64 * 100.0),
            _ => None,
        }
    }

    /// CPU time expressed in years (8760 hours each).
    pub fn cpu_years(&self) -> Option<f64> {
        self.cpu_seconds.map(|s| s as f64 / 3600.0 / 8760.0)
    }
}

/// Normalized result of a single successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformStats {
    pub platform: Platform,
    pub summary: PlatformSummary,
    pub projects: Vec<ProjectRecord>,
}

/// Everything the renderers need, built once per run.
///
/// Fields are private: a snapshot is only produced by the aggregator (or by
/// deserializing a previous run's JSON) and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    total_credits: u64,
    projects: Vec<ProjectRecord>,
    platforms: BTreeMap<Platform, PlatformSummary>,
    #[serde(default)]
    unavailable_platforms: Vec<Platform>,
    #[serde(default)]
    unavailable_projects: Vec<String>,
    years_active: f64,
    generated_at: DateTime<Utc>,
}

impl AggregateSnapshot {
    pub(crate) fn new(
        total_credits: u64,
        projects: Vec<ProjectRecord>,
        platforms: BTreeMap<Platform, PlatformSummary>,
        unavailable_platforms: Vec<Platform>,
        unavailable_projects: Vec<String>,
        years_active: f64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            total_credits,
            projects,
            platforms,
            unavailable_platforms,
            unavailable_projects,
            years_active,
            generated_at,
        }
    }

    pub fn total_credits(&self) -> u64 {
        self.total_credits
    }

    /// Projects sorted by descending credits, ties by name.
    pub fn projects(&self) -> &[ProjectRecord] {
        &self.projects
    }

    pub fn platforms(&self) -> &BTreeMap<Platform, PlatformSummary> {
        &self.platforms
    }

    pub fn platform(&self, platform: Platform) -> Option<&PlatformSummary> {
        self.platforms.get(&platform)
    }

    pub fn unavailable_platforms(&self) -> &[Platform] {
        &self.unavailable_platforms
    }

    /// Tracked projects with no data this run, in configured order.
    pub fn unavailable_projects(&self) -> &[String] {
        &self.unavailable_projects
    }

    pub fn years_active(&self) -> f64 {
        self.years_active
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}
