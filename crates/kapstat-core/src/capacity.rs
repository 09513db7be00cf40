//! Capacity aggregation state machine
//!
//! This module implements the reduction chain behind the Norwegian capacity
//! tariff: instantaneous power samples are averaged per walltime hour, each
//! day's highest hourly average becomes that day's *day-max* (døgnmaks), and
//! the mean of the three highest day-maxima in the current calendar month is
//! the number the tariff tier is selected from.
//!
//! The tracker is an online reducer over whatever samples actually arrive: a
//! gap of several hours or days between samples loses the intervening
//! buckets' contributions; nothing is zero-filled or reconstructed.
//!
//! # Examples
//! ```
//! use kapstat_core::capacity::CapacityTracker;
//! use kapstat_core::types::SampleTimestamp;
//! use chrono_tz::Tz;
//!
//! let mut tracker = CapacityTracker::new(Tz::UTC);
//! let ts = |s| SampleTimestamp::parse(s).unwrap();
//!
//! tracker.update(&ts("2024-01-01T10:15:00Z"), 2.0);
//! tracker.update(&ts("2024-01-01T10:45:00Z"), 4.0);
//!
//! // The open hour contributes a peek without being finalized
//! assert_eq!(tracker.top_three_average(), 3.0);
//! ```

use chrono::{NaiveDateTime, Timelike};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::types::{DayDate, SampleTimestamp};

/// One walltime hour of accumulating power samples
///
/// Holds a running sum and count so the hourly average can be derived on
/// demand. Created when the tracker opens a new hour, superseded when a
/// sample lands in a different hour.
#[derive(Debug, Clone)]
pub struct HourBucket {
    start: NaiveDateTime,
    sum_kw: f64,
    count: u32,
}

impl HourBucket {
    fn new(start: NaiveDateTime) -> Self {
        Self {
            start,
            sum_kw: 0.0,
            count: 0,
        }
    }

    /// The walltime hour this bucket represents
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Fold a sample into the bucket
    ///
    /// Negative readings (sensor noise, export/feed-in) count as zero draw,
    /// never as negative. Always succeeds.
    pub fn add(&mut self, kw: f64) {
        self.sum_kw += kw.max(0.0);
        self.count += 1;
    }

    /// Average power over the samples seen so far, `0.0` for an empty bucket
    pub fn average_kw(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_kw / f64::from(self.count)
        }
    }

    /// Number of samples folded in
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Truncate a walltime to the top of its hour
fn hour_start(t: NaiveDateTime) -> NaiveDateTime {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Tracks hourly averages, day-maxima, and the month's top-3 mean
///
/// One tracker exists per monitored meter. All state is volatile; a process
/// restart loses the accumulated hour/day/month history. The tracker has no
/// internal synchronization; callers that share one across tasks must
/// serialize access themselves.
#[derive(Debug, Clone)]
pub struct CapacityTracker {
    tz: Tz,
    current_hour: Option<HourBucket>,
    current_day: Option<DayDate>,
    day_max_kw: f64,
    daily_max_by_date: BTreeMap<DayDate, f64>,
    n_samples: u64,
}

impl CapacityTracker {
    /// Create an empty tracker bucketing walltime in the given zone
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            current_hour: None,
            current_day: None,
            day_max_kw: 0.0,
            daily_max_by_date: BTreeMap::new(),
            n_samples: 0,
        }
    }

    /// The reference zone used for hour truncation and date extraction
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Feed one power sample. This is the sole mutator.
    ///
    /// Rollovers are detected relative to the previously stored state and
    /// resolved in a fixed order: month clear, day flush, hour fold, then the
    /// sample lands in the now-current bucket. At most one pending hour and
    /// one pending day are folded per call.
    pub fn update(&mut self, timestamp: &SampleTimestamp, power_kw: f64) {
        let walltime = timestamp.walltime(&self.tz);
        let hour = hour_start(walltime);
        let day = DayDate::new(walltime.date());

        match self.current_day {
            None => {
                self.current_day = Some(day);
                self.day_max_kw = 0.0;
            }
            Some(current_day) => {
                // The month clear runs before the day flush. On a combined
                // day+month boundary the outgoing day's max is therefore
                // written into the freshly cleared map under its old date
                // key: the final day of a month outlives the month by one
                // day. Tests pin this ordering.
                if !day.same_month(&current_day) {
                    self.daily_max_by_date.clear();
                }
                if day != current_day {
                    self.daily_max_by_date.insert(current_day, self.day_max_kw);
                    self.current_day = Some(day);
                    self.day_max_kw = 0.0;
                }
            }
        }

        // Fold the finished hour's average into the day peak, then open a
        // bucket for the sample's hour. Runs after the day flush: an hour
        // finalized by the first sample of a new day raises the new day's
        // peak, not the flushed one.
        let stale = self
            .current_hour
            .as_ref()
            .is_none_or(|bucket| bucket.start() != hour);
        if stale {
            if let Some(finished) = self.current_hour.take() {
                self.day_max_kw = self.day_max_kw.max(finished.average_kw());
            }
            self.current_hour = Some(HourBucket::new(hour));
        }
        if let Some(bucket) = self.current_hour.as_mut() {
            bucket.add(power_kw);
        }
        self.n_samples += 1;
    }

    /// Mean of the three highest day-maxima in the current month
    ///
    /// Read-only: includes a peek at today's still-accumulating value (the
    /// open hour may raise it without being finalized) and averages over
    /// however many candidates exist; missing slots are never counted as
    /// zero. Returns `0.0` before the first sample.
    pub fn top_three_average(&self) -> f64 {
        let mut values: Vec<f64> = self.daily_max_by_date.values().copied().collect();
        if self.current_day.is_some() {
            values.push(self.today_peek_kw());
        }
        if values.is_empty() {
            return 0.0;
        }
        values.sort_by(|a, b| b.total_cmp(a));
        let top = &values[..values.len().min(3)];
        top.iter().sum::<f64>() / top.len() as f64
    }

    /// Today's running peak: finalized hours plus the open hour's average
    pub fn today_peek_kw(&self) -> f64 {
        let mut peek = self.day_max_kw;
        if let Some(bucket) = &self.current_hour {
            peek = peek.max(bucket.average_kw());
        }
        peek
    }

    /// Finalized day-maxima of the current month, keyed by date
    pub fn day_maxima(&self) -> &BTreeMap<DayDate, f64> {
        &self.daily_max_by_date
    }

    /// The date currently accumulating a day-max, if any sample has arrived
    pub fn current_day(&self) -> Option<DayDate> {
        self.current_day
    }

    /// Total samples folded in over the tracker's lifetime
    pub fn n_samples(&self) -> u64 {
        self.n_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(s: &str) -> SampleTimestamp {
        SampleTimestamp::parse(s).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> DayDate {
        DayDate::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn tracker() -> CapacityTracker {
        CapacityTracker::new(Tz::UTC)
    }

    #[test]
    fn test_empty_bucket_averages_zero() {
        let bucket = HourBucket::new(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        );
        assert_eq!(bucket.average_kw(), 0.0);
    }

    #[test]
    fn test_bucket_average_is_mean_of_clamped_samples() {
        let mut bucket = HourBucket::new(
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        );
        bucket.add(2.0);
        bucket.add(4.0);
        bucket.add(-6.0); // clamps to zero draw
        assert_eq!(bucket.count(), 3);
        assert_eq!(bucket.average_kw(), 2.0);
    }

    #[test]
    fn test_hour_rollover_folds_average_into_day_max() {
        let mut t = tracker();
        t.update(&ts("2024-01-01T10:15:00Z"), 2.0);
        t.update(&ts("2024-01-01T10:45:00Z"), 4.0);
        t.update(&ts("2024-01-01T11:05:00Z"), 0.0);

        // Hour 10 finalized at (2+4)/2 = 3.0
        assert_eq!(t.today_peek_kw(), 3.0);
        assert_eq!(t.top_three_average(), 3.0);
    }

    #[test]
    fn test_day_rollover_stores_day_max_and_resets() {
        let mut t = tracker();
        t.update(&ts("2024-01-01T10:00:00Z"), 5.0);
        t.update(&ts("2024-01-01T11:00:00Z"), 1.0); // finalizes hour 10 at 5.0
        t.update(&ts("2024-01-02T00:30:00Z"), 0.5);

        assert_eq!(t.day_maxima().get(&day(2024, 1, 1)), Some(&5.0));
        assert_eq!(t.current_day(), Some(day(2024, 1, 2)));
        // Day 2's running peak knows nothing of day 1. The hour finalized by
        // the day-crossing sample (day 1, hour 11, average 1.0) lands in day
        // 2's peak per the fixed rollover order.
        assert_eq!(t.today_peek_kw(), 1.0);
    }

    #[test]
    fn test_month_rollover_clears_previous_month() {
        let mut t = tracker();
        t.update(&ts("2024-01-10T10:00:00Z"), 5.0);
        t.update(&ts("2024-01-11T10:00:00Z"), 5.0);
        t.update(&ts("2024-01-12T10:00:00Z"), 5.0);
        assert_eq!(t.day_maxima().len(), 2);

        t.update(&ts("2024-02-01T10:00:00Z"), 1.0);
        // Jan 10 and 11 are gone; only the quirk survivor (Jan 12) remains.
        assert!(!t.day_maxima().contains_key(&day(2024, 1, 10)));
        assert!(!t.day_maxima().contains_key(&day(2024, 1, 11)));
    }

    #[test]
    fn test_month_boundary_keeps_final_day_of_old_month() {
        // The map is cleared before the day flush, so the last day of the
        // outgoing month is written into the new month's map under its old
        // date key and survives exactly one extra day.
        let mut t = tracker();
        t.update(&ts("2024-01-31T10:00:00Z"), 8.0);
        t.update(&ts("2024-01-31T11:00:00Z"), 2.0); // finalize hour 10 at 8.0

        t.update(&ts("2024-02-01T00:10:00Z"), 1.0);
        assert_eq!(t.day_maxima().len(), 1);
        assert_eq!(t.day_maxima().get(&day(2024, 1, 31)), Some(&8.0));

        // The next day boundary clears nothing (same month) and flushes Feb 1,
        // so the survivor stays until the following month rollover.
        t.update(&ts("2024-02-02T00:10:00Z"), 1.0);
        assert!(t.day_maxima().contains_key(&day(2024, 1, 31)));
        assert!(t.day_maxima().contains_key(&day(2024, 2, 1)));

        t.update(&ts("2024-03-01T00:10:00Z"), 1.0);
        assert!(!t.day_maxima().contains_key(&day(2024, 1, 31)));
    }

    #[test]
    fn test_top_three_of_four_days() {
        let mut t = tracker();
        // One finalized hour per day at 5, 9, 3, 7 kW, then a probe sample
        // far into a later day of the same month so all four flush.
        for (d, kw) in [(10, 5.0), (11, 9.0), (12, 3.0), (13, 7.0)] {
            t.update(&ts(&format!("2024-01-{d}T10:00:00Z")), kw);
            t.update(&ts(&format!("2024-01-{d}T11:00:00Z")), 0.0);
        }
        t.update(&ts("2024-01-20T00:00:00Z"), 0.0);

        // (9 + 7 + 5) / 3, today's zero peek does not displace anything
        assert_eq!(t.top_three_average(), 7.0);
    }

    #[test]
    fn test_top_three_averages_over_what_exists() {
        let mut t = tracker();
        t.update(&ts("2024-01-01T10:00:00Z"), 4.0);
        t.update(&ts("2024-01-02T10:00:00Z"), 6.0); // flushes day 1 at 4.0

        // Two candidates only: {4.0, today-peek 6.0} → 5.0, never padded
        // with a zero third slot.
        assert_eq!(t.top_three_average(), 5.0);
    }

    #[test]
    fn test_queries_are_pure() {
        let mut t = tracker();
        t.update(&ts("2024-01-01T10:00:00Z"), 3.0);
        t.update(&ts("2024-01-01T11:00:00Z"), 5.0);

        let first = t.top_three_average();
        for _ in 0..10 {
            assert_eq!(t.top_three_average(), first);
        }
        assert_eq!(t.today_peek_kw(), t.today_peek_kw());
    }

    #[test]
    fn test_partial_hour_raises_peek_without_finalizing() {
        let mut t = tracker();
        t.update(&ts("2024-01-01T10:00:00Z"), 2.0);
        t.update(&ts("2024-01-01T11:00:00Z"), 10.0); // hour 10 → day max 2.0

        // Open hour 11 averages 10.0 and peeks above the finalized 2.0
        assert_eq!(t.top_three_average(), 10.0);
        // but the finalized day max is untouched
        assert_eq!(t.day_maxima().len(), 0);

        // Another sample pulls the open average down; the peek follows.
        t.update(&ts("2024-01-01T11:30:00Z"), 0.0);
        assert_eq!(t.top_three_average(), 5.0);
    }

    #[test]
    fn test_gap_folds_at_most_one_hour() {
        let mut t = tracker();
        t.update(&ts("2024-01-01T08:00:00Z"), 6.0);
        // Jump four hours ahead: hours 9-11 never existed and contribute
        // nothing; only hour 8 is folded.
        t.update(&ts("2024-01-01T12:00:00Z"), 1.0);

        assert_eq!(t.today_peek_kw(), 6.0);
        t.update(&ts("2024-01-01T13:00:00Z"), 0.0);
        assert_eq!(t.today_peek_kw(), 6.0);
    }

    #[test]
    fn test_out_of_order_sample_reopens_hour() {
        let mut t = tracker();
        t.update(&ts("2024-01-01T10:00:00Z"), 4.0);
        // A sample from the previous hour is just a rollover trigger: hour 10
        // finalizes at 4.0 and a fresh bucket opens at hour 9.
        t.update(&ts("2024-01-01T09:30:00Z"), 2.0);

        assert_eq!(t.day_max_kw_for_test(), 4.0);
        assert_eq!(t.today_peek_kw(), 4.0);
    }

    #[test]
    fn test_first_sample_initializes() {
        let mut t = tracker();
        assert_eq!(t.top_three_average(), 0.0);
        assert_eq!(t.current_day(), None);

        t.update(&ts("2024-01-01T10:30:00Z"), 1.5);
        assert_eq!(t.current_day(), Some(day(2024, 1, 1)));
        assert_eq!(t.n_samples(), 1);
        assert_eq!(t.top_three_average(), 1.5);
    }

    #[test]
    fn test_walltime_bucketing_respects_zone() {
        // 23:30 UTC on Jan 31 is already Feb 1 in Oslo (UTC+1): the sample
        // must open February, not January.
        let mut t = CapacityTracker::new(Tz::Europe__Oslo);
        t.update(&ts("2024-01-31T23:30:00Z"), 2.0);
        assert_eq!(t.current_day(), Some(day(2024, 2, 1)));
    }

    impl CapacityTracker {
        fn day_max_kw_for_test(&self) -> f64 {
            self.day_max_kw
        }
    }
}
