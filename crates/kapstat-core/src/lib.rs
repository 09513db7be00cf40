//! Core types and the capacity aggregation state machine for kapstat
//!
//! This crate provides the foundational pieces used by the rest of the
//! workspace: strongly-typed sample/meter/date types, error handling,
//! reference-zone configuration, and [`capacity::CapacityTracker`], the
//! hour/day/month reducer behind the Norwegian capacity tariff.

pub mod capacity;
pub mod error;
pub mod timezone;
pub mod types;

// Re-export commonly used types
pub use capacity::{CapacityTracker, HourBucket};
pub use error::{KapstatError, Result};
pub use types::{DayDate, MeterId, PowerSample, RawSampleRecord, SampleTimestamp};
