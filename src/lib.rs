//! kapstat - Track Norwegian grid capacity tariffs from power sample logs
//!
//! This library provides functionality to:
//! - Stream power samples from JSONL files
//! - Reduce them to hourly averages, daily maxima, and the month's top-3 mean
//! - Select the matching capacity tier, fee, and margin from a tariff table
//! - Generate reports in table and JSON formats
//! - Watch sample files and refresh the report live
//!
//! # Examples
//!
//! ```no_run
//! use kapstat::{
//!     aggregation::Aggregator,
//!     data_loader::DataLoader,
//!     filters::SampleFilter,
//!     timezone::TimezoneConfig,
//! };
//! use kapstat_tariff::default_table;
//!
//! #[tokio::main]
//! async fn main() -> kapstat::Result<()> {
//!     let loader = DataLoader::new(vec!["samples/".into()])?;
//!     let aggregator = Aggregator::new(TimezoneConfig::default(), default_table().clone());
//!     let report = aggregator
//!         .aggregate(loader.load_samples(), &SampleFilter::new())
//!         .await?;
//!     println!("{} meter(s)", report.meters.len());
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod cli;
pub mod data_loader;
pub mod filters;
pub mod live_monitor;
pub mod output;

// Core modules shared across the workspace
pub use kapstat_core::{error, timezone, types};

// Re-export commonly used types
pub use kapstat_core::{
    CapacityTracker, DayDate, KapstatError, MeterId, PowerSample, Result, SampleTimestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
