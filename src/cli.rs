//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// crunchstats - living README for volunteer computing stats
///
/// Fetches Folding@home and World Community Grid statistics and rewrites
/// the marked region of a README plus a JSON snapshot.
///
/// Examples:
///   crunchstats --fah-username me --wcg-member me --wcg-code XXXX
///   crunchstats --config .crunchstats.toml --readme profile/README.md
///   crunchstats --dry-run
///   crunchstats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .crunchstats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// README file containing the stats markers
    #[arg(long, value_name = "FILE")]
    pub readme: Option<PathBuf>,

    /// JSON snapshot output path
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Folding@home donor name
    #[arg(long, value_name = "NAME", env = "FAH_USERNAME")]
    pub fah_username: Option<String>,

    /// World Community Grid member name
    #[arg(long, value_name = "NAME", env = "WCG_MEMBER_NAME")]
    pub wcg_member: Option<String>,

    /// World Community Grid verification code
    #[arg(long, value_name = "CODE", env = "WCG_VERIFICATION_CODE", hide_env_values = true)]
    pub wcg_code: Option<String>,

    /// First day of volunteering (YYYY-MM-DD), used for "years active"
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Fetch and render, print the section, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Create the README with empty markers if it does not exist
    #[arg(long)]
    pub create_missing: bool,

    /// Generate a default .crunchstats.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got {:?}: {}", value, e))
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.dry_run && self.create_missing {
            return Err("--create-missing has no effect with --dry-run".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            readme: None,
            json: None,
            fah_username: Some("crunch_er".to_string()),
            wcg_member: None,
            wcg_code: None,
            start_date: None,
            timeout: None,
            dry_run: false,
            create_missing: false,
            init_config: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "crunchstats",
            "--readme",
            "profile/README.md",
            "--start-date",
            "2018-06-03",
            "--timeout",
            "10",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.readme, Some(PathBuf::from("profile/README.md")));
        assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2018, 6, 3));
        assert_eq!(args.timeout, Some(10));
        assert!(args.dry_run);
    }

    #[test]
    fn test_parse_bad_date() {
        let result = Args::try_parse_from(["crunchstats", "--start-date", "06/03/2018"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.dry_run = true;
        args.create_missing = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
