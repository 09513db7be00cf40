//! Replay aggregation and the capacity report
//!
//! The [`Aggregator`] drives the core state machine: it consumes the sample
//! stream, feeds one [`CapacityTracker`] per meter (trackers are owned here
//! in a plain `BTreeMap`, nothing is process-global) and derives the
//! report: the month's top-3 mean, the selected tier, its fee, and the
//! margin to the next tier.
//!
//! Rounding is a reporting concern and happens only here: kW values to three
//! decimals, fees to two. The trackers hold raw `f64` throughout.
//!
//! # Examples
//!
//! ```no_run
//! use kapstat::aggregation::Aggregator;
//! use kapstat::data_loader::DataLoader;
//! use kapstat::filters::SampleFilter;
//! use kapstat::timezone::TimezoneConfig;
//! use kapstat_tariff::default_table;
//!
//! # async fn example() -> kapstat::Result<()> {
//! let loader = DataLoader::new(vec!["samples/".into()])?;
//! let aggregator = Aggregator::new(TimezoneConfig::default(), default_table().clone());
//! let report = aggregator
//!     .aggregate(loader.load_samples(), &SampleFilter::new())
//!     .await?;
//! for meter in &report.meters {
//!     println!("{}: {} kW ({})", meter.meter, meter.top_three_avg_kw, meter.tier_label);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::filters::SampleFilter;
use crate::timezone::TimezoneConfig;
use crate::types::{DayDate, MeterId, PowerSample};
use futures::stream::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use kapstat_core::capacity::CapacityTracker;
use kapstat_tariff::TierTable;
use serde::Serialize;
use std::collections::BTreeMap;

/// One day-max row in a meter's report
#[derive(Debug, Clone, Serialize)]
pub struct DailyMax {
    /// The walltime date
    pub date: DayDate,
    /// The day's peak hourly average in kW, rounded to 3 decimals
    pub max_kw: f64,
    /// False for today's still-accumulating peek
    pub finalized: bool,
}

/// Capacity summary for a single meter
#[derive(Debug, Clone, Serialize)]
pub struct MeterCapacity {
    /// Meter identifier
    pub meter: MeterId,
    /// Mean of the month's three highest day-maxima, rounded to 3 decimals
    pub top_three_avg_kw: f64,
    /// Label of the selected capacity tier
    pub tier_label: String,
    /// The tier's fixed monthly fee in NOK, rounded to 2 decimals
    pub tier_fee_kr: f64,
    /// Headroom before the next tier in kW, rounded to 3 decimals;
    /// `None` in the unbounded top tier
    pub margin_kw: Option<f64>,
    /// Day-maxima backing the metric, oldest first
    pub daily_max: Vec<DailyMax>,
    /// Samples folded into this meter's tracker
    pub n_samples: u64,
}

/// The full capacity report across meters
#[derive(Debug, Clone, Serialize)]
pub struct CapacityReport {
    /// Reference zone the bucketing ran in
    pub timezone: String,
    /// Per-meter summaries, ordered by meter id
    pub meters: Vec<MeterCapacity>,
}

/// Round to three decimals (kW convention)
fn round_kw(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Round to two decimals (NOK convention)
fn round_kr(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Drives capacity trackers over a sample stream and builds the report
pub struct Aggregator {
    tz_config: TimezoneConfig,
    table: TierTable,
    show_progress: bool,
}

impl Aggregator {
    /// Create an aggregator for the given reference zone and tier table
    pub fn new(tz_config: TimezoneConfig, table: TierTable) -> Self {
        Self {
            tz_config,
            table,
            show_progress: false,
        }
    }

    /// Enable a replay spinner on terminal output
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// The reference zone configuration
    pub fn timezone_config(&self) -> &TimezoneConfig {
        &self.tz_config
    }

    /// The effective tier table
    pub fn table(&self) -> &TierTable {
        &self.table
    }

    /// Replay a sample stream into per-meter trackers and report
    ///
    /// Samples must arrive in the order they should be folded; the tracker
    /// is an online reducer and does not reorder. Meters appear in the
    /// report sorted by id.
    pub async fn aggregate(
        &self,
        samples: impl Stream<Item = Result<PowerSample>>,
        filter: &SampleFilter,
    ) -> Result<CapacityReport> {
        let progress = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Replaying samples...");
            Some(pb)
        } else {
            None
        };

        let mut trackers: BTreeMap<MeterId, CapacityTracker> = BTreeMap::new();
        let mut n_seen: u64 = 0;

        tokio::pin!(samples);
        while let Some(result) = samples.next().await {
            let sample = result?;
            if !filter.matches(&sample, &self.tz_config.tz) {
                continue;
            }

            trackers
                .entry(sample.meter.clone())
                .or_insert_with(|| CapacityTracker::new(self.tz_config.tz))
                .update(&sample.timestamp, sample.power_kw);

            n_seen += 1;
            if let Some(pb) = &progress
                && n_seen % 1000 == 0
            {
                pb.set_message(format!("Replaying samples... {n_seen}"));
                pb.tick();
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        tracing::debug!("Replayed {} samples into {} tracker(s)", n_seen, trackers.len());

        let meters = trackers
            .iter()
            .map(|(meter, tracker)| self.summarize(meter, tracker))
            .collect();

        Ok(CapacityReport {
            timezone: self.tz_config.display_name().to_string(),
            meters,
        })
    }

    /// Build one meter's summary from its tracker state
    fn summarize(&self, meter: &MeterId, tracker: &CapacityTracker) -> MeterCapacity {
        let avg_kw = tracker.top_three_average();
        let selection = self.table.tier_for(avg_kw);

        let mut daily_max: Vec<DailyMax> = tracker
            .day_maxima()
            .iter()
            .map(|(date, max_kw)| DailyMax {
                date: *date,
                max_kw: round_kw(*max_kw),
                finalized: true,
            })
            .collect();
        if let Some(today) = tracker.current_day() {
            daily_max.push(DailyMax {
                date: today,
                max_kw: round_kw(tracker.today_peek_kw()),
                finalized: false,
            });
        }

        MeterCapacity {
            meter: meter.clone(),
            top_three_avg_kw: round_kw(avg_kw),
            tier_label: selection.tier.label.clone(),
            tier_fee_kr: round_kr(selection.tier.fee_kr),
            margin_kw: selection
                .margin_kw
                .is_finite()
                .then(|| round_kw(selection.margin_kw)),
            daily_max,
            n_samples: tracker.n_samples(),
        }
    }
}
