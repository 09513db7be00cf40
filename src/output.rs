//! Output formatting for capacity reports
//!
//! Two formatters behind one trait: an ASCII table for terminals and JSON
//! for machine consumption, selected by `--json`. Formatters are pure
//! string builders; printing is the caller's job.

use crate::aggregation::{CapacityReport, MeterCapacity};
use kapstat_tariff::TierTable;
use prettytable::{Table, format, row};
use serde_json::json;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format the full capacity report
    fn format_report(&self, report: &CapacityReport) -> String;

    /// Format the effective tier table
    fn format_tiers(&self, table: &TierTable) -> String;
}

/// Table formatter for human-readable terminal output
pub struct TableFormatter;

impl TableFormatter {
    /// Create a new TableFormatter
    pub fn new() -> Self {
        Self
    }

    fn format_margin(margin_kw: Option<f64>) -> String {
        match margin_kw {
            Some(margin) => format!("{margin:.3} kW"),
            None => "-".to_string(),
        }
    }

    fn meter_section(meter: &MeterCapacity) -> String {
        let mut out = String::new();

        let mut summary = Table::new();
        summary.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        summary.set_titles(row![
            b -> "Meter",
            b -> "Top-3 Avg",
            b -> "Tier",
            b -> "Monthly Fee",
            b -> "Margin to Next",
            b -> "Samples"
        ]);
        summary.add_row(row![
            meter.meter.as_str(),
            r -> format!("{:.3} kW", meter.top_three_avg_kw),
            meter.tier_label,
            r -> format!("{:.2} kr", meter.tier_fee_kr),
            r -> Self::format_margin(meter.margin_kw),
            r -> meter.n_samples
        ]);
        out.push_str(&summary.to_string());

        if !meter.daily_max.is_empty() {
            let mut days = Table::new();
            days.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
            days.set_titles(row![b -> "Date", b -> "Day Max", b -> ""]);
            for day in &meter.daily_max {
                let marker = if day.finalized { "" } else { "(running)" };
                days.add_row(row![
                    day.date.to_string(),
                    r -> format!("{:.3} kW", day.max_kw),
                    marker
                ]);
            }
            out.push_str(&days.to_string());
        }

        out
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableFormatter {
    fn format_report(&self, report: &CapacityReport) -> String {
        if report.meters.is_empty() {
            return format!("No samples found (timezone: {})\n", report.timezone);
        }

        let mut out = String::new();
        for meter in &report.meters {
            out.push_str(&Self::meter_section(meter));
            out.push('\n');
        }
        out.push_str(&format!("Timezone: {}\n", report.timezone));
        out
    }

    fn format_tiers(&self, table: &TierTable) -> String {
        let mut tiers = Table::new();
        tiers.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        tiers.set_titles(row![b -> "Tier", b -> "Upper Bound", b -> "Monthly Fee"]);
        for tier in table.tiers() {
            let upper = if tier.upper_kw.is_finite() {
                format!("< {} kW", tier.upper_kw)
            } else {
                "unbounded".to_string()
            };
            tiers.add_row(row![
                tier.label,
                r -> upper,
                r -> format!("{:.2} kr", tier.fee_kr)
            ]);
        }
        tiers.to_string()
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JsonFormatter
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &CapacityReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_tiers(&self, table: &TierTable) -> String {
        let tiers: Vec<_> = table
            .tiers()
            .iter()
            .map(|tier| {
                json!({
                    "label": tier.label,
                    "upper_kw": tier.upper_kw.is_finite().then_some(tier.upper_kw),
                    "fee_kr": tier.fee_kr,
                })
            })
            .collect();
        serde_json::to_string_pretty(&json!({ "tiers": tiers }))
            .unwrap_or_else(|_| "{}".to_string())
    }
}

/// Get the formatter matching the `--json` flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter::new())
    } else {
        Box::new(TableFormatter::new())
    }
}
