//! Core domain types for kapstat
//!
//! This module contains the fundamental types used throughout the kapstat
//! workspace: meter identifiers, sample timestamps, calendar dates used as
//! aggregation keys, and the power sample itself.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongly-typed meter identifier
///
/// One capacity tracker exists per monitored meter (circuit); the meter id is
/// the key that groups samples together. Sample records that carry no meter
/// field fall back to [`MeterId::default`].
///
/// # Examples
/// ```
/// use kapstat_core::types::MeterId;
///
/// let meter = MeterId::new("garage");
/// assert_eq!(meter.as_str(), "garage");
/// assert_eq!(MeterId::default().as_str(), "main");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeterId(String);

impl MeterId {
    /// Create a new MeterId from any string-like type
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MeterId {
    fn default() -> Self {
        Self("main".to_string())
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MeterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// UTC timestamp of a power sample
///
/// Wraps chrono's `DateTime<Utc>`. Offset-less input timestamps are defaulted
/// to UTC at parse time; conversion to the reference zone's walltime happens
/// when the tracker buckets the sample.
///
/// # Examples
/// ```
/// use kapstat_core::types::SampleTimestamp;
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::Tz;
///
/// let ts = SampleTimestamp::new(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
/// // Walltime in Oslo is one hour ahead of UTC in January
/// let walltime = ts.walltime(&Tz::Europe__Oslo);
/// assert_eq!(walltime.to_string(), "2024-01-15 11:30:00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleTimestamp(DateTime<Utc>);

impl SampleTimestamp {
    /// Create a new SampleTimestamp
    pub fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the inner DateTime
    pub fn inner(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse an RFC 3339 timestamp, defaulting offset-less input to UTC
    ///
    /// Returns `None` when the string is neither an RFC 3339 timestamp nor a
    /// naive `YYYY-MM-DDTHH:MM:SS` walltime.
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        // Offset-less timestamps are assumed to be UTC
        s.parse::<NaiveDateTime>()
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }

    /// The sample's walltime in the given reference zone
    pub fn walltime(&self, tz: &Tz) -> NaiveDateTime {
        self.0.with_timezone(tz).naive_local()
    }
}

impl AsRef<DateTime<Utc>> for SampleTimestamp {
    fn as_ref(&self) -> &DateTime<Utc> {
        &self.0
    }
}

/// Calendar date used as the day-max aggregation key
///
/// Represents a date in the reference zone's walltime, without time-of-day
/// information. Day-maxima are stored under this key, scoped to the current
/// calendar month.
///
/// # Examples
/// ```
/// use kapstat_core::types::DayDate;
/// use chrono::NaiveDate;
///
/// let a = DayDate::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
/// let b = DayDate::new(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
/// let c = DayDate::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
///
/// assert!(a.same_month(&b));
/// assert!(!b.same_month(&c));
/// assert_eq!(a.format("%Y-%m-%d"), "2024-01-15");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayDate(NaiveDate);

impl DayDate {
    /// Create a new DayDate
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Get the inner NaiveDate
    pub fn inner(&self) -> &NaiveDate {
        &self.0
    }

    /// Whether the other date falls in the same calendar month and year
    pub fn same_month(&self, other: &DayDate) -> bool {
        self.0.month() == other.0.month() && self.0.year() == other.0.year()
    }

    /// Format with a strftime pattern
    pub fn format(&self, fmt: &str) -> String {
        self.0.format(fmt).to_string()
    }
}

impl fmt::Display for DayDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A single instantaneous power reading
///
/// The primary input of the capacity tracker: which meter, when, and the
/// instantaneous draw in kilowatts. Values are already validated at this
/// point; the tracker additionally clamps negatives to zero.
///
/// # Examples
/// ```
/// use kapstat_core::types::{MeterId, PowerSample, SampleTimestamp};
/// use chrono::{TimeZone, Utc};
///
/// let sample = PowerSample {
///     meter: MeterId::default(),
///     timestamp: SampleTimestamp::new(Utc.with_ymd_and_hms(2024, 1, 15, 10, 15, 0).unwrap()),
///     power_kw: 3.2,
/// };
///
/// let json = serde_json::to_string(&sample).unwrap();
/// assert!(json.contains("3.2"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSample {
    /// Meter this reading belongs to
    pub meter: MeterId,
    /// When the reading was taken
    pub timestamp: SampleTimestamp,
    /// Instantaneous power draw in kilowatts
    pub power_kw: f64,
}

/// Raw JSONL record as written by exporters
///
/// Field names are deliberately loose: `power_kw` also accepts the short
/// alias `kw`, and `meter` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSampleRecord {
    /// Timestamp string, RFC 3339 or naive walltime
    pub timestamp: String,
    /// Power reading in kilowatts
    #[serde(alias = "kw")]
    pub power_kw: f64,
    /// Meter identifier
    #[serde(default)]
    pub meter: Option<String>,
}

impl PowerSample {
    /// Convert a raw record into a domain sample
    ///
    /// Returns `None` for records the core must never see: unparseable
    /// timestamps and non-finite power values. Rejection is logged at debug
    /// level and counted by the loader; it is never fatal.
    pub fn from_raw(raw: RawSampleRecord) -> Option<Self> {
        let timestamp = match SampleTimestamp::parse(&raw.timestamp) {
            Some(ts) => ts,
            None => {
                tracing::debug!("Skipping sample with invalid timestamp: {}", raw.timestamp);
                return None;
            }
        };

        if !raw.power_kw.is_finite() {
            tracing::debug!("Skipping sample with non-finite power value");
            return None;
        }

        Some(Self {
            meter: raw.meter.map(MeterId::new).unwrap_or_default(),
            timestamp,
            power_kw: raw.power_kw,
        })
    }
}
