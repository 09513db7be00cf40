//! Error types for kapstat
//!
//! All fallible operations in the workspace report through [`KapstatError`].
//! The capacity core itself never fails (negative readings clamp to zero,
//! empty windows average to zero, a tier lookup miss falls back to the last
//! tier), so every variant here belongs to the boundary: file I/O, sample parsing,
//! CLI validation, and tariff configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kapstat operations
#[derive(Error, Debug)]
pub enum KapstatError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// No sample files found at the given or default paths
    #[error("No sample data found")]
    NoSampleData,

    /// Invalid date filter format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid timezone name
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Tier table failed validation
    #[error("Invalid tier table: {0}")]
    InvalidTierTable(String),

    /// Parse error with file context
    #[error("Parse error in {file}: {error}")]
    Parse {
        /// The file that caused the error
        file: PathBuf,
        /// The error message
        error: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results in kapstat
pub type Result<T> = std::result::Result<T, KapstatError>;
