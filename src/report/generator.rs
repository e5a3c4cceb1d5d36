//! Markdown and JSON rendering.
//!
//! Both renderers are pure functions of the snapshot (plus, for Markdown,
//! the configured identities used in profile links), so the same snapshot
//! always renders to the same bytes.

use crate::models::{AggregateSnapshot, Platform, PlatformSummary, ProjectRecord};
use anyhow::Result;
use reqwest::Url;

/// Identities shown next to each platform section.
#[derive(Debug, Clone, Default)]
pub struct Identities {
    pub folding_username: Option<String>,
    pub grid_member: Option<String>,
}

impl Identities {
    fn for_platform(&self, platform: Platform) -> Option<&str> {
        let name = match platform {
            Platform::FoldingAtHome => self.folding_username.as_deref(),
            Platform::WorldCommunityGrid => self.grid_member.as_deref(),
        };
        name.map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Render the Markdown body that goes between the README markers.
pub fn generate_markdown_section(snapshot: &AggregateSnapshot, identities: &Identities) -> String {
    let mut output = String::new();

    output.push_str(&generate_header(snapshot));

    for platform in Platform::ALL {
        let identity = identities.for_platform(platform);
        match snapshot.platform(platform) {
            Some(summary) => {
                output.push_str(&generate_platform_section(platform, summary, identity))
            }
            None => output.push_str(&generate_unavailable_section(platform, identity)),
        }
    }

    output.push_str(&generate_projects_section(snapshot));
    output.push_str(&generate_impact_section(snapshot));
    output.push_str(&generate_footer());

    output
}

fn generate_header(snapshot: &AggregateSnapshot) -> String {
    let mut section = String::new();

    section.push_str("## 🧬 Scientific Computing Contributions\n\n");
    section.push_str(
        "I contribute spare computing power to volunteer research platforms for medical breakthroughs.\n\n",
    );
    section.push_str(&format!(
        "**🔄 Last Updated:** `{}`\n\n",
        snapshot.generated_at().format("%Y-%m-%d %H:%M UTC")
    ));
    section.push_str("---\n\n");

    section
}

fn generate_platform_section(
    platform: Platform,
    summary: &PlatformSummary,
    identity: Option<&str>,
) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {} {}\n\n", platform.emoji(), platform));

    match platform {
        Platform::FoldingAtHome => {
            section.push_str(&badge("F@H Score", "Score", &group_thousands(summary.points), "blue"));
            section.push_str(&badge(
                "F@H Work Units",
                "Work_Units",
                &group_thousands(summary.work_units),
                "green",
            ));
            if let Some(rank) = summary.rank {
                section.push_str(&badge(
                    "F@H Rank",
                    "Rank",
                    &format!("%23{}", group_thousands(rank)),
                    "purple",
                ));
            }
            section.push('\n');

            section.push_str(&format!(
                "- 🎯 **{} points** earned through protein folding calculations\n",
                group_thousands(summary.points)
            ));
            section.push_str(&format!(
                "- ⚡ **{} work units** completed for disease research\n",
                group_thousands(summary.work_units)
            ));
            if let Some(rank) = summary.rank {
                match summary.contributors {
                    Some(total) => section.push_str(&format!(
                        "- 🏆 **Rank #{}** out of {} contributors worldwide\n",
                        group_thousands(rank),
                        group_thousands(total)
                    )),
                    None => section.push_str(&format!("- 🏆 **Rank #{}**\n", group_thousands(rank))),
                }
            }
            if let Some(top) = summary.top_percent() {
                section.push_str(&format!(
                    "- 📊 **Top {:.1}%** of all Folding@home donors\n",
                    top
                ));
            }
        }
        Platform::WorldCommunityGrid => {
            let cpu_years = summary.cpu_years().map(format_cpu_years);
            if let Some(ref years) = cpu_years {
                section.push_str(&badge("CPU Years", "CPU_Years", years, "purple"));
            }
            section.push_str(&badge(
                "WCG Results",
                "Results",
                &group_thousands(summary.work_units),
                "red",
            ));
            section.push_str(&badge(
                "WCG Points",
                "Points",
                &group_thousands(summary.points),
                "green",
            ));
            section.push('\n');

            if let Some(ref years) = cpu_years {
                section.push_str(&format!(
                    "- ⚡ **{} CPU-years** dedicated to medical research\n",
                    years
                ));
            }
            section.push_str(&format!(
                "- 🧬 **{} results** returned in the latest batch\n",
                group_thousands(summary.work_units)
            ));
            section.push_str(&format!(
                "- 🏅 **{} points** granted\n",
                group_thousands(summary.points)
            ));
            if let Some(rank) = summary.rank {
                section.push_str(&format!("- 🏆 **Rank #{}**\n", group_thousands(rank)));
            }
        }
    }

    section.push('\n');
    section.push_str(&generate_identity_line(platform, identity));
    section.push_str("---\n\n");

    section
}

/// Placeholder for a platform whose fetch failed (or was not configured).
fn generate_unavailable_section(platform: Platform, identity: Option<&str>) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {} {}\n\n", platform.emoji(), platform));
    section.push_str("**Status:** ⚠️ Data unavailable this run.\n\n");
    section.push_str(&generate_identity_line(platform, identity));
    section.push_str("---\n\n");

    section
}

fn generate_identity_line(platform: Platform, identity: Option<&str>) -> String {
    let Some(name) = identity else {
        return String::new();
    };

    let shown = name.replace('`', "");
    match profile_url(platform, name) {
        Some(url) => format!("**Username:** `{}` · [View profile]({})\n\n", shown, url),
        None => format!("**Username:** `{}`\n\n", shown),
    }
}

fn profile_url(platform: Platform, name: &str) -> Option<String> {
    match platform {
        Platform::FoldingAtHome => {
            let mut url = Url::parse("https://stats.foldingathome.org").ok()?;
            url.path_segments_mut()
                .ok()?
                .pop_if_empty()
                .push("donor")
                .push(name);
            Some(url.to_string())
        }
        Platform::WorldCommunityGrid => Url::parse_with_params(
            "https://www.worldcommunitygrid.org/stat/viewMemberInfo.do",
            &[("userName", name)],
        )
        .ok()
        .map(|u| u.to_string()),
    }
}

/// Platforms that normally contribute project rows but failed this run.
fn missing_project_sources(snapshot: &AggregateSnapshot) -> Vec<Platform> {
    snapshot
        .unavailable_platforms()
        .iter()
        .copied()
        .filter(Platform::reports_projects)
        .collect()
}

/// Per-project credit table; tracked projects with no data get their own row.
fn generate_projects_section(snapshot: &AggregateSnapshot) -> String {
    let missing_sources = missing_project_sources(snapshot);
    if snapshot.projects().is_empty()
        && snapshot.unavailable_projects().is_empty()
        && missing_sources.is_empty()
    {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("### 📋 Projects\n\n");
    section.push_str("| Project | Platform | Credits | Member Since |\n");
    section.push_str("|:---|:---|---:|:---:|\n");

    for project in snapshot.projects() {
        section.push_str(&generate_project_row(project));
    }
    for name in snapshot.unavailable_projects() {
        section.push_str(&format!(
            "| {} | | _unavailable_ | |\n",
            escape_cell(name)
        ));
    }
    // Untracked mode has no names to list, so the whole platform gets a row.
    if snapshot.unavailable_projects().is_empty() {
        for platform in &missing_sources {
            section.push_str(&format!("| _all projects_ | {} | _unavailable_ | |\n", platform));
        }
    }
    section.push('\n');

    section
}

fn generate_project_row(project: &ProjectRecord) -> String {
    format!(
        "| {} | {} | {} | {} |\n",
        escape_cell(&project.name),
        project.source,
        group_thousands(project.credits),
        project.member_since.format("%Y-%m-%d")
    )
}

fn generate_impact_section(snapshot: &AggregateSnapshot) -> String {
    let mut section = String::new();

    section.push_str("### 🌟 Combined Impact\n\n");

    let counted = snapshot.projects().len();
    let partial = !missing_project_sources(snapshot).is_empty();
    if partial && counted == 0 {
        section.push_str("- 🧮 Project credits unavailable this run\n");
    } else {
        section.push_str(&format!(
            "- 🧮 **{} credits** across {} project{}{}\n",
            group_thousands(snapshot.total_credits()),
            counted,
            if counted == 1 { "" } else { "s" },
            if partial { " (partial)" } else { "" }
        ));
    }
    section.push_str(&format!(
        "- 📅 **{:.1} years** of volunteer computing\n",
        snapshot.years_active()
    ));
    if !snapshot.unavailable_platforms().is_empty() {
        let names: Vec<String> = snapshot
            .unavailable_platforms()
            .iter()
            .map(|p| p.to_string())
            .collect();
        section.push_str(&format!(
            "- ⚠️ Not included this run: {}\n",
            names.join(", ")
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "*Stats refreshed automatically by crunchstats.*\n".to_string()
}

fn badge(alt: &str, label: &str, value: &str, color: &str) -> String {
    format!(
        "![{}](https://img.shields.io/badge/{}-{}-{}?style=for-the-badge)\n",
        alt, label, value, color
    )
}

/// Render JSON for the snapshot file.
pub fn generate_json_snapshot(snapshot: &AggregateSnapshot) -> Result<String> {
    let mut json = serde_json::to_string_pretty(snapshot)?;
    json.push('\n');
    Ok(json)
}

/// Minimal skeleton used when the README does not exist yet.
pub fn bootstrap_document(begin_marker: &str, end_marker: &str) -> String {
    format!(
        "# 🧬 Scientific Computing Dashboard\n\n{}\n{}\n",
        begin_marker, end_marker
    )
}

/// Format an integer with comma thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_cpu_years(years: f64) -> String {
    if years < 1.0 {
        format!("{:.2}", years)
    } else {
        format!("{:.1}", years)
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::fetch::FetchError;
    use crate::models::PlatformStats;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 4, 0, 0, 0).unwrap()
    }

    fn project(name: &str, credits: u64) -> ProjectRecord {
        ProjectRecord {
            name: name.to_string(),
            credits,
            member_since: NaiveDate::from_ymd_opt(2018, 6, 3).unwrap(),
            source: Platform::WorldCommunityGrid,
        }
    }

    fn folding_summary() -> PlatformSummary {
        PlatformSummary {
            points: 7_908_286,
            work_units: 149,
            rank: Some(103_877),
            fetched_at: now(),
            contributors: Some(2_735_935),
            cpu_seconds: None,
        }
    }

    fn grid_summary() -> PlatformSummary {
        PlatformSummary {
            points: 24_229_788,
            work_units: 4,
            rank: None,
            fetched_at: now(),
            contributors: None,
            cpu_seconds: Some(27_000),
        }
    }

    /// Both platforms up, the shape the two real fetchers produce.
    fn scenario_snapshot() -> AggregateSnapshot {
        aggregate(
            vec![
                (
                    Platform::FoldingAtHome,
                    Ok(PlatformStats {
                        platform: Platform::FoldingAtHome,
                        summary: folding_summary(),
                        projects: vec![],
                    }),
                ),
                (
                    Platform::WorldCommunityGrid,
                    Ok(PlatformStats {
                        platform: Platform::WorldCommunityGrid,
                        summary: grid_summary(),
                        projects: vec![
                            project("Mapping Cancer Markers", 1_064_227),
                            project("OpenPandemics", 23_165_561),
                        ],
                    }),
                ),
            ],
            &[],
            NaiveDate::from_ymd_opt(2018, 6, 3).unwrap(),
            now(),
        )
    }

    /// Folding ok, grid timed out.
    fn outage_snapshot(tracked: &[String]) -> AggregateSnapshot {
        aggregate(
            vec![
                (
                    Platform::FoldingAtHome,
                    Ok(PlatformStats {
                        platform: Platform::FoldingAtHome,
                        summary: folding_summary(),
                        projects: vec![],
                    }),
                ),
                (
                    Platform::WorldCommunityGrid,
                    Err(FetchError::Network("timed out".to_string())),
                ),
            ],
            tracked,
            NaiveDate::from_ymd_opt(2018, 6, 3).unwrap(),
            now(),
        )
    }

    fn identities() -> Identities {
        Identities {
            folding_username: Some("crunch_er".to_string()),
            grid_member: Some("crunch er".to_string()),
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(24_229_788), "24,229,788");
        assert_eq!(group_thousands(100_000), "100,000");
    }

    #[test]
    fn test_format_cpu_years() {
        assert_eq!(format_cpu_years(0.123), "0.12");
        assert_eq!(format_cpu_years(3.456), "3.5");
    }

    #[test]
    fn test_markdown_scenario() {
        let markdown = generate_markdown_section(&scenario_snapshot(), &identities());

        assert!(markdown.contains("**🔄 Last Updated:** `2026-02-04 00:00 UTC`"));
        assert!(markdown.contains("**7,908,286 points**"));
        assert!(markdown.contains("**149 work units**"));
        assert!(markdown.contains("Rank #103,877"));
        assert!(markdown.contains("**Top 3.8%**"));
        assert!(markdown.contains("**24,229,788 credits** across 2 projects\n"));
        assert!(markdown.contains("**7.7 years**"));
        assert!(!markdown.contains("Not included this run"));
        assert!(!markdown.contains("_unavailable_"));
        assert!(markdown.ends_with('\n'));
    }

    #[test]
    fn test_failed_platform_renders_unavailable_not_zero() {
        let markdown = generate_markdown_section(&outage_snapshot(&[]), &identities());

        let grid_start = markdown.find("### 🌍 World Community Grid").unwrap();
        let grid_end = grid_start + markdown[grid_start..].find("---").unwrap();
        let grid_section = &markdown[grid_start..grid_end];

        assert!(grid_section.contains("Data unavailable"));
        assert!(!grid_section.contains("points"));
        assert!(!grid_section.contains(" 0 "));
        assert!(markdown.contains("Not included this run: World Community Grid"));
    }

    #[test]
    fn test_grid_outage_without_tracked_projects() {
        let markdown = generate_markdown_section(&outage_snapshot(&[]), &identities());

        assert!(markdown.contains("### 📋 Projects"));
        assert!(markdown.contains("| _all projects_ | World Community Grid | _unavailable_ | |"));
        assert!(markdown.contains("- 🧮 Project credits unavailable this run\n"));
        assert!(!markdown.contains("**0 credits**"));
    }

    #[test]
    fn test_grid_outage_with_tracked_projects() {
        let tracked = vec!["OpenPandemics".to_string(), "Help Stop TB".to_string()];
        let markdown = generate_markdown_section(&outage_snapshot(&tracked), &identities());

        assert!(markdown.contains("| OpenPandemics | | _unavailable_ | |"));
        assert!(markdown.contains("| Help Stop TB | | _unavailable_ | |"));
        assert!(!markdown.contains("_all projects_"));
        assert!(markdown.contains("Project credits unavailable this run"));
    }

    #[test]
    fn test_project_rows_sorted() {
        let markdown = generate_markdown_section(&scenario_snapshot(), &identities());

        let first = markdown.find("| OpenPandemics |").unwrap();
        let second = markdown.find("| Mapping Cancer Markers |").unwrap();
        assert!(first < second);
        assert!(markdown.contains("| 23,165,561 | 2018-06-03 |"));
    }

    #[test]
    fn test_unavailable_project_row() {
        let snapshot = aggregate(
            vec![(
                Platform::WorldCommunityGrid,
                Ok(PlatformStats {
                    platform: Platform::WorldCommunityGrid,
                    summary: grid_summary(),
                    projects: vec![project("OpenPandemics", 10)],
                }),
            )],
            &["OpenPandemics".to_string(), "Help Stop TB".to_string()],
            NaiveDate::from_ymd_opt(2018, 6, 3).unwrap(),
            now(),
        );

        let markdown = generate_markdown_section(&snapshot, &Identities::default());

        assert!(markdown.contains("| Help Stop TB | | _unavailable_ | |"));
        assert!(!markdown.contains("| Help Stop TB | World Community Grid | 0 |"));
        assert!(markdown.contains("**0.00 CPU-years**"));
        assert!(markdown.contains("**10 credits** across 1 project\n"));
    }

    #[test]
    fn test_identity_links() {
        let line = generate_identity_line(Platform::WorldCommunityGrid, Some("crunch er"));
        assert!(line.contains("`crunch er`"));
        assert!(line.contains("viewMemberInfo.do?userName=crunch+er"));

        let line = generate_identity_line(Platform::FoldingAtHome, Some("crunch_er"));
        assert!(line.contains("https://stats.foldingathome.org/donor/crunch_er"));

        assert!(generate_identity_line(Platform::FoldingAtHome, None).is_empty());
    }

    #[test]
    fn test_markdown_is_deterministic() {
        let snapshot = scenario_snapshot();
        assert_eq!(
            generate_markdown_section(&snapshot, &identities()),
            generate_markdown_section(&snapshot, &identities())
        );
    }

    #[test]
    fn test_json_snapshot_shape() {
        let json = generate_json_snapshot(&scenario_snapshot()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total_credits"], 24_229_788);
        assert_eq!(value["projects"][0]["name"], "OpenPandemics");
        assert_eq!(value["projects"][0]["credits"], 23_165_561);
        assert_eq!(value["projects"][0]["member_since"], "2018-06-03");
        assert_eq!(value["projects"][0]["source"], "world_community_grid");
        assert_eq!(value["projects"][1]["credits"], 1_064_227);
        assert_eq!(value["platforms"]["folding_at_home"]["points"], 7_908_286);
        assert_eq!(value["platforms"]["folding_at_home"]["work_units"], 149);
        assert_eq!(value["platforms"]["folding_at_home"]["rank"], 103_877);
        assert_eq!(value["platforms"]["world_community_grid"]["cpu_seconds"], 27_000);
        assert_eq!(value["unavailable_platforms"], serde_json::json!([]));
        assert_eq!(value["years_active"], 7.7);
        assert!(value["generated_at"].as_str().unwrap().starts_with("2026-02-04T00:00:00"));
    }

    #[test]
    fn test_json_snapshot_outage() {
        let json = generate_json_snapshot(&outage_snapshot(&[])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["platforms"].get("world_community_grid").is_none());
        assert_eq!(value["unavailable_platforms"][0], "world_community_grid");
        assert_eq!(value["projects"], serde_json::json!([]));
    }

    #[test]
    fn test_json_key_order_is_stable() {
        let json = generate_json_snapshot(&scenario_snapshot()).unwrap();
        let keys = [
            "\"total_credits\"",
            "\"projects\"",
            "\"platforms\"",
            "\"unavailable_platforms\"",
            "\"unavailable_projects\"",
            "\"years_active\"",
            "\"generated_at\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_json_roundtrips_into_snapshot() {
        let snapshot = scenario_snapshot();
        let json = generate_json_snapshot(&snapshot).unwrap();
        let parsed: AggregateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_bootstrap_document() {
        let doc = bootstrap_document("<!-- A -->", "<!-- B -->");
        assert!(doc.contains("\n<!-- A -->\n<!-- B -->\n"));
    }
}
