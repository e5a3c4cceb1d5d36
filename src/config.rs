//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.crunchstats.toml` files.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fetch::{folding, grid};
use crate::report::splice::{DEFAULT_BEGIN_MARKER, DEFAULT_END_MARKER};
use crate::report::{Identities, Markers};

pub const DEFAULT_CONFIG_FILE: &str = ".crunchstats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Folding@home identity.
    #[serde(default)]
    pub folding: FoldingConfig,

    /// World Community Grid identity and tracked projects.
    #[serde(default)]
    pub grid: GridConfig,

    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// First day of volunteering, used for "years active".
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 6, 3).unwrap_or_default()
}

fn default_timeout() -> u64 {
    30
}

/// Folding@home settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldingConfig {
    /// Donor name. The platform is skipped when unset.
    #[serde(default)]
    pub username: Option<String>,

    /// API base URL.
    #[serde(default = "default_folding_url")]
    pub base_url: String,
}

impl Default for FoldingConfig {
    fn default() -> Self {
        Self {
            username: None,
            base_url: default_folding_url(),
        }
    }
}

fn default_folding_url() -> String {
    folding::DEFAULT_BASE_URL.to_string()
}

/// World Community Grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Member name. The platform is skipped when unset.
    #[serde(default)]
    pub member: Option<String>,

    /// Verification code from the member profile page.
    /// Prefer the WCG_VERIFICATION_CODE env var over storing it here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,

    /// API base URL.
    #[serde(default = "default_grid_url")]
    pub base_url: String,

    /// Maximum number of results requested.
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Projects to show, in order. Empty shows every project returned.
    #[serde(default)]
    pub projects: Vec<String>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            member: None,
            verification_code: None,
            base_url: default_grid_url(),
            limit: default_limit(),
            projects: Vec::new(),
        }
    }
}

fn default_grid_url() -> String {
    grid::DEFAULT_BASE_URL.to_string()
}

fn default_limit() -> u32 {
    grid::DEFAULT_LIMIT
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// README whose marker region gets replaced.
    #[serde(default = "default_readme")]
    pub readme: PathBuf,

    /// JSON snapshot path (fully overwritten each run).
    #[serde(default = "default_json")]
    pub json: PathBuf,

    #[serde(default = "default_begin_marker")]
    pub begin_marker: String,

    #[serde(default = "default_end_marker")]
    pub end_marker: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            readme: default_readme(),
            json: default_json(),
            begin_marker: default_begin_marker(),
            end_marker: default_end_marker(),
        }
    }
}

fn default_readme() -> PathBuf {
    PathBuf::from("README.md")
}

fn default_json() -> PathBuf {
    PathBuf::from("stats.json")
}

fn default_begin_marker() -> String {
    DEFAULT_BEGIN_MARKER.to_string()
}

fn default_end_marker() -> String {
    DEFAULT_END_MARKER.to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their env vars) take precedence over the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref readme) = args.readme {
            self.output.readme = readme.clone();
        }
        if let Some(ref json) = args.json {
            self.output.json = json.clone();
        }
        if let Some(ref username) = args.fah_username {
            self.folding.username = Some(username.clone());
        }
        if let Some(ref member) = args.wcg_member {
            self.grid.member = Some(member.clone());
        }
        if let Some(ref code) = args.wcg_code {
            self.grid.verification_code = Some(code.clone());
        }
        if let Some(start_date) = args.start_date {
            self.general.start_date = start_date;
        }
        if let Some(timeout) = args.timeout {
            self.general.timeout_seconds = timeout;
        }
    }

    /// Reject settings that would make every run fail.
    pub fn validate(&self) -> Result<()> {
        if self.general.timeout_seconds == 0 {
            bail!("timeout_seconds must be at least 1");
        }
        if self.grid.limit == 0 {
            bail!("grid.limit must be at least 1");
        }

        for (name, url) in [
            ("folding.base_url", &self.folding.base_url),
            ("grid.base_url", &self.grid.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("{} must start with 'http://' or 'https://'", name);
            }
        }

        let begin = self.output.begin_marker.trim();
        let end = self.output.end_marker.trim();
        if begin.is_empty() || end.is_empty() {
            bail!("output markers must not be empty");
        }
        if self.output.begin_marker == self.output.end_marker {
            bail!("begin_marker and end_marker must differ");
        }

        Ok(())
    }

    pub fn markers(&self) -> Markers {
        Markers {
            begin: self.output.begin_marker.clone(),
            end: self.output.end_marker.clone(),
        }
    }

    pub fn identities(&self) -> Identities {
        Identities {
            folding_username: self.folding.username.clone(),
            grid_member: self.grid.member.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
