//! CLI interface for kapstat
//!
//! Command structure: `kapstat <command> [paths…] [flags]`.
//!
//! # Example
//!
//! ```bash
//! # Replay January's samples in Oslo walltime and print the report
//! kapstat report samples/ --timezone Europe/Oslo --since 2024-01
//!
//! # Follow a live sample log, refreshing on change
//! kapstat watch /var/log/power.jsonl --interval 10
//!
//! # Show the effective tier table after applying a tariff file
//! kapstat tiers --tariff my-dso.json --json
//! ```

use crate::error::{KapstatError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Track Norwegian grid capacity tariffs from power sample logs
#[derive(Parser, Debug, Clone)]
#[command(name = "kapstat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show debug output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Timezone for bucketing and date filters (e.g. "Europe/Oslo")
    /// If not specified, uses the system's local timezone
    #[arg(long, short = 'z', global = true)]
    pub timezone: Option<String>,

    /// Use UTC for bucketing and date filters (overrides --timezone)
    #[arg(long, global = true)]
    pub utc: bool,

    /// Filter by start date (YYYY-MM-DD or YYYY-MM)
    #[arg(long, global = true)]
    pub since: Option<String>,

    /// Filter by end date (YYYY-MM-DD or YYYY-MM)
    #[arg(long, global = true)]
    pub until: Option<String>,

    /// Only report this meter
    #[arg(long, short = 'm', global = true)]
    pub meter: Option<String>,

    /// Tariff file with fee overrides or a custom tier table
    #[arg(long, env = "KAPSTAT_TARIFF", global = true)]
    pub tariff: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Replay sample files and print the capacity report
    Report {
        /// Sample files or directories (falls back to $KAPSTAT_DATA_PATH)
        paths: Vec<PathBuf>,
    },
    /// Watch sample files and refresh the report on change
    Watch {
        /// Sample files or directories (falls back to $KAPSTAT_DATA_PATH)
        paths: Vec<PathBuf>,

        /// Refresh interval in seconds
        #[arg(long, default_value = "5")]
        interval: u64,
    },
    /// Print the effective tier table
    Tiers,
}

/// Parse a date filter in YYYY-MM-DD or YYYY-MM form
///
/// A month alone maps to its first day, which is what an inclusive
/// `--since` wants; pair `--until` with a full date when the end of a month
/// matters.
///
/// # Examples
/// ```
/// use kapstat::cli::parse_date_filter;
/// use chrono::Datelike;
///
/// let date = parse_date_filter("2024-01-15").unwrap();
/// assert_eq!(date.day(), 15);
///
/// let date = parse_date_filter("2024-01").unwrap();
/// assert_eq!(date.day(), 1);
/// ```
pub fn parse_date_filter(date_str: &str) -> Result<chrono::NaiveDate> {
    if let Ok(date) = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        return Ok(date);
    }

    let parts: Vec<&str> = date_str.split('-').collect();
    if parts.len() == 2 {
        let year = parts[0]
            .parse::<i32>()
            .map_err(|_| KapstatError::InvalidDate(format!("Invalid year in '{date_str}'")))?;
        let month = parts[1]
            .parse::<u32>()
            .map_err(|_| KapstatError::InvalidDate(format!("Invalid month in '{date_str}'")))?;

        if !(1..=12).contains(&month) {
            return Err(KapstatError::InvalidDate(format!(
                "Month must be between 1-12, got {month}"
            )));
        }

        chrono::NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| KapstatError::InvalidDate(format!("Invalid date: {date_str}")))
    } else {
        Err(KapstatError::InvalidDate(format!(
            "Invalid date format '{date_str}', expected YYYY-MM-DD or YYYY-MM"
        )))
    }
}
