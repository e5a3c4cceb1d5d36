//! Snapshot aggregation and derived statistics.
//!
//! This module merges per-platform fetch outcomes into one
//! [`AggregateSnapshot`] and computes the derived numbers shown in the
//! README.

use crate::fetch::FetchError;
use crate::models::{AggregateSnapshot, Platform, PlatformStats, PlatformSummary, ProjectRecord};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Build the snapshot for this run.
///
/// Failed platforms are recorded as unavailable and contribute nothing.
/// The outcome order does not affect the result.
pub fn aggregate(
    outcomes: Vec<(Platform, Result<PlatformStats, FetchError>)>,
    tracked_projects: &[String],
    start_date: NaiveDate,
    now: DateTime<Utc>,
) -> AggregateSnapshot {
    let mut platforms: BTreeMap<Platform, PlatformSummary> = BTreeMap::new();
    let mut unavailable: BTreeSet<Platform> = BTreeSet::new();
    let mut projects: Vec<ProjectRecord> = Vec::new();

    for (platform, outcome) in outcomes {
        match outcome {
            Ok(stats) => {
                platforms.insert(platform, stats.summary);
                projects.extend(stats.projects);
            }
            Err(_) => {
                unavailable.insert(platform);
            }
        }
    }

    let (projects, unavailable_projects) = filter_tracked(projects, tracked_projects);
    let projects = sort_projects(projects);
    let total_credits = total_credits(&projects);

    AggregateSnapshot::new(
        total_credits,
        projects,
        platforms,
        unavailable.into_iter().collect(),
        unavailable_projects,
        years_active(start_date, now),
        now,
    )
}

/// Keep only tracked projects; an empty list tracks everything.
///
/// Returns the kept records and the tracked names that had no record.
pub fn filter_tracked(
    projects: Vec<ProjectRecord>,
    tracked: &[String],
) -> (Vec<ProjectRecord>, Vec<String>) {
    if tracked.is_empty() {
        return (projects, Vec::new());
    }

    let kept: Vec<ProjectRecord> = projects
        .into_iter()
        .filter(|p| tracked.iter().any(|t| t == &p.name))
        .collect();

    let mut missing: Vec<String> = Vec::new();
    for name in tracked {
        if !kept.iter().any(|p| &p.name == name) && !missing.contains(name) {
            missing.push(name.clone());
        }
    }

    (kept, missing)
}

/// Sort by credits (highest first), then name, then platform.
pub fn sort_projects(mut projects: Vec<ProjectRecord>) -> Vec<ProjectRecord> {
    projects.sort_by(|a, b| {
        b.credits
            .cmp(&a.credits)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.source.cmp(&b.source))
    });
    projects
}

/// Sum of all project credits, saturating at `u64::MAX`.
pub fn total_credits(projects: &[ProjectRecord]) -> u64 {
    projects
        .iter()
        .fold(0u64, |total, p| total.saturating_add(p.credits))
}

/// Years between `start` and `now`, one decimal, never negative.
pub fn years_active(start: NaiveDate, now: DateTime<Utc>) -> f64 {
    let days = (now.date_naive() - start).num_days().max(0);
    let years = days as f64 / 365.25;
    (years * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 4, 12, 0, 0).unwrap()
    }

    fn project(name: &str, credits: u64) -> ProjectRecord {
        ProjectRecord {
            name: name.to_string(),
            credits,
            member_since: date(2020, 1, 1),
            source: Platform::WorldCommunityGrid,
        }
    }

    fn summary(points: u64, work_units: u64) -> PlatformSummary {
        PlatformSummary {
            points,
            work_units,
            rank: None,
            fetched_at: now(),
            contributors: None,
            cpu_seconds: None,
        }
    }

    fn folding_ok() -> (Platform, Result<PlatformStats, FetchError>) {
        (
            Platform::FoldingAtHome,
            Ok(PlatformStats {
                platform: Platform::FoldingAtHome,
                summary: summary(7_908_286, 149),
                projects: vec![],
            }),
        )
    }

    fn grid_ok(projects: Vec<ProjectRecord>) -> (Platform, Result<PlatformStats, FetchError>) {
        (
            Platform::WorldCommunityGrid,
            Ok(PlatformStats {
                platform: Platform::WorldCommunityGrid,
                summary: summary(total_credits(&projects), projects.len() as u64),
                projects,
            }),
        )
    }

    fn grid_down() -> (Platform, Result<PlatformStats, FetchError>) {
        (
            Platform::WorldCommunityGrid,
            Err(FetchError::Network("timed out".to_string())),
        )
    }

    #[test]
    fn test_total_is_sum_of_projects() {
        let snapshot = aggregate(
            vec![
                folding_ok(),
                grid_ok(vec![project("OpenPandemics", 23_165_561), project("MCM", 1_064_227)]),
            ],
            &[],
            date(2018, 6, 3),
            now(),
        );

        assert_eq!(snapshot.total_credits(), 24_229_788);
        assert_eq!(snapshot.projects()[0].credits, 23_165_561);
        assert_eq!(snapshot.projects()[1].credits, 1_064_227);
        assert!(snapshot.unavailable_platforms().is_empty());
        assert_eq!(snapshot.platforms().len(), 2);
    }

    #[test]
    fn test_total_saturates() {
        let projects = vec![project("A", u64::MAX), project("B", 5)];
        assert_eq!(total_credits(&projects), u64::MAX);
    }

    #[test]
    fn test_failed_platform_is_omitted_not_zeroed() {
        let snapshot = aggregate(
            vec![folding_ok(), grid_down()],
            &["OpenPandemics".to_string()],
            date(2018, 6, 3),
            now(),
        );

        assert!(snapshot.platform(Platform::WorldCommunityGrid).is_none());
        assert_eq!(
            snapshot.unavailable_platforms(),
            &[Platform::WorldCommunityGrid]
        );
        assert_eq!(
            snapshot.platform(Platform::FoldingAtHome).unwrap().points,
            7_908_286
        );
        assert_eq!(snapshot.total_credits(), 0);
        assert!(snapshot.projects().is_empty());
        assert_eq!(snapshot.unavailable_projects(), &["OpenPandemics".to_string()]);
    }

    #[test]
    fn test_ties_break_alphabetically() {
        let sorted = sort_projects(vec![
            project("Beta", 100),
            project("Gamma", 500),
            project("Alpha", 100),
        ]);
        let names: Vec<&str> = sorted.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
    }

    #[test]
    fn test_order_independent() {
        let projects = vec![project("Alpha", 100), project("Beta", 100), project("Zeta", 7)];
        let mut reversed = projects.clone();
        reversed.reverse();

        let a = aggregate(
            vec![folding_ok(), grid_ok(projects)],
            &[],
            date(2018, 6, 3),
            now(),
        );
        let b = aggregate(
            vec![grid_ok(reversed), folding_ok()],
            &[],
            date(2018, 6, 3),
            now(),
        );

        assert_eq!(a, b);
    }

    #[test]
    fn test_filter_tracked() {
        let tracked = vec![
            "OpenPandemics".to_string(),
            "Africa Rainfall".to_string(),
            "OpenPandemics".to_string(),
        ];
        let (kept, missing) = filter_tracked(
            vec![project("OpenPandemics", 10), project("Untracked", 99)],
            &tracked,
        );

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "OpenPandemics");
        assert_eq!(missing, vec!["Africa Rainfall".to_string()]);
    }

    #[test]
    fn test_missing_tracked_project_adds_nothing() {
        let snapshot = aggregate(
            vec![grid_ok(vec![project("OpenPandemics", 10)])],
            &["OpenPandemics".to_string(), "Smash Childhood Cancer".to_string()],
            date(2018, 6, 3),
            now(),
        );

        assert_eq!(snapshot.total_credits(), 10);
        assert_eq!(snapshot.projects().len(), 1);
        assert_eq!(
            snapshot.unavailable_projects(),
            &["Smash Childhood Cancer".to_string()]
        );
    }

    #[test]
    fn test_years_active() {
        let now = Utc.with_ymd_and_hms(2026, 2, 4, 0, 0, 0).unwrap();
        assert_eq!(years_active(date(2018, 6, 3), now), 7.7);
        assert_eq!(years_active(date(2026, 2, 4), now), 0.0);
        assert_eq!(years_active(date(2030, 1, 1), now), 0.0);
    }

    #[test]
    fn test_generated_at_is_now() {
        let snapshot = aggregate(vec![], &[], date(2018, 6, 3), now());
        assert_eq!(snapshot.generated_at(), now());
        assert_eq!(snapshot.total_credits(), 0);
        assert!(snapshot.platforms().is_empty());
    }
}
