//! Filtering for power samples
//!
//! Replay can be restricted to a date range and a single meter. Date
//! comparisons happen on the sample's walltime date in the configured
//! reference zone, so `--since`/`--until` mean the same calendar days the
//! report buckets by.

use crate::types::{MeterId, PowerSample};
use chrono::NaiveDate;
use chrono_tz::Tz;

/// Filter configuration for power samples
///
/// All filters are optional and combine conjunctively.
#[derive(Debug, Default, Clone)]
pub struct SampleFilter {
    /// Start date (inclusive), in reference-zone walltime
    pub since_date: Option<NaiveDate>,
    /// End date (inclusive), in reference-zone walltime
    pub until_date: Option<NaiveDate>,
    /// Only samples for this meter
    pub meter: Option<MeterId>,
}

impl SampleFilter {
    /// Create a filter with no restrictions
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start date filter
    pub fn with_since(mut self, date: NaiveDate) -> Self {
        self.since_date = Some(date);
        self
    }

    /// Set the end date filter
    pub fn with_until(mut self, date: NaiveDate) -> Self {
        self.until_date = Some(date);
        self
    }

    /// Set the meter filter
    pub fn with_meter(mut self, meter: MeterId) -> Self {
        self.meter = Some(meter);
        self
    }

    /// Check whether a sample passes the filter
    pub fn matches(&self, sample: &PowerSample, tz: &Tz) -> bool {
        let sample_date = sample.timestamp.walltime(tz).date();

        if let Some(since) = &self.since_date
            && sample_date < *since
        {
            return false;
        }
        if let Some(until) = &self.until_date
            && sample_date > *until
        {
            return false;
        }
        if let Some(meter) = &self.meter
            && sample.meter != *meter
        {
            return false;
        }

        true
    }
}
