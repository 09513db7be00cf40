//! Typed tariff options with set-if-absent default merging
//!
//! Grid companies publish the same step structure with different fees, and
//! users override individual numbers without restating the rest. Options are
//! therefore a struct of named `Option<f64>` fields, one per standard
//! capacity step, merged field-by-field against the documented defaults:
//! a field the user set is never overwritten, an absent field takes the
//! default. A fully custom `tiers` array sidesteps the step fields entirely.
//!
//! # Examples
//! ```
//! use kapstat_tariff::options::TariffOptions;
//!
//! let mut options = TariffOptions {
//!     fee_2_5_kr: Some(210.0),
//!     ..Default::default()
//! };
//! options.merge_defaults(&TariffOptions::defaults());
//!
//! // The user-set field survives, the rest fill in
//! assert_eq!(options.fee_2_5_kr, Some(210.0));
//! assert_eq!(options.fee_0_2_kr, Some(125.0));
//!
//! let table = options.to_table().unwrap();
//! assert_eq!(table.tier_for(3.0).tier.fee_kr, 210.0);
//! ```

use kapstat_core::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::tiers::{CapacityTier, TierTable};

/// Default monthly fees (NOK) for the standard capacity steps
pub const DEFAULT_FEE_0_2_KR: f64 = 125.0;
pub const DEFAULT_FEE_2_5_KR: f64 = 190.0;
pub const DEFAULT_FEE_5_10_KR: f64 = 300.0;
pub const DEFAULT_FEE_10_15_KR: f64 = 420.0;
pub const DEFAULT_FEE_15_20_KR: f64 = 535.0;
pub const DEFAULT_FEE_20_25_KR: f64 = 650.0;
pub const DEFAULT_FEE_OVER_25_KR: f64 = 1250.0;

/// One tier as written in a tariff file
///
/// `upper_kw` is optional because JSON has no infinity literal: `null` (or an
/// omitted field) marks the unbounded sentinel tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Exclusive upper bound in kW; absent for the sentinel tier
    #[serde(default)]
    pub upper_kw: Option<f64>,
    /// Band label
    pub label: String,
    /// Fixed monthly fee in NOK
    pub fee_kr: f64,
}

impl TierSpec {
    fn to_tier(&self) -> CapacityTier {
        CapacityTier::new(
            self.upper_kw.unwrap_or(f64::INFINITY),
            self.label.clone(),
            self.fee_kr,
        )
    }
}

/// User-editable tariff numbers
///
/// All fields are optional so a tariff file only needs to state what differs
/// from the defaults. [`merge_defaults`](Self::merge_defaults) fills the
/// rest; [`to_table`](Self::to_table) produces the validated [`TierTable`]
/// the tracker's capacity value is looked up in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TariffOptions {
    /// Monthly fee for the 0–2 kW step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_0_2_kr: Option<f64>,
    /// Monthly fee for the 2–5 kW step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_2_5_kr: Option<f64>,
    /// Monthly fee for the 5–10 kW step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_5_10_kr: Option<f64>,
    /// Monthly fee for the 10–15 kW step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_10_15_kr: Option<f64>,
    /// Monthly fee for the 15–20 kW step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_15_20_kr: Option<f64>,
    /// Monthly fee for the 20–25 kW step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_20_25_kr: Option<f64>,
    /// Monthly fee above 25 kW
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_over_25_kr: Option<f64>,
    /// Fully custom tier table; overrides the step fees entirely when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<TierSpec>>,
}

impl TariffOptions {
    /// The documented defaults, every field set
    pub fn defaults() -> Self {
        Self {
            fee_0_2_kr: Some(DEFAULT_FEE_0_2_KR),
            fee_2_5_kr: Some(DEFAULT_FEE_2_5_KR),
            fee_5_10_kr: Some(DEFAULT_FEE_5_10_KR),
            fee_10_15_kr: Some(DEFAULT_FEE_10_15_KR),
            fee_15_20_kr: Some(DEFAULT_FEE_15_20_KR),
            fee_20_25_kr: Some(DEFAULT_FEE_20_25_KR),
            fee_over_25_kr: Some(DEFAULT_FEE_OVER_25_KR),
            tiers: None,
        }
    }

    /// Load options from a JSON tariff file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading tariff options from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let options = serde_json::from_str(&contents)?;
        Ok(options)
    }

    /// Fill absent fields from another options set, field by field
    ///
    /// Set-if-absent: a field that already holds a value is never touched.
    /// A custom `tiers` array is merged the same way.
    pub fn merge_defaults(&mut self, defaults: &TariffOptions) {
        if self.fee_0_2_kr.is_none() {
            self.fee_0_2_kr = defaults.fee_0_2_kr;
        }
        if self.fee_2_5_kr.is_none() {
            self.fee_2_5_kr = defaults.fee_2_5_kr;
        }
        if self.fee_5_10_kr.is_none() {
            self.fee_5_10_kr = defaults.fee_5_10_kr;
        }
        if self.fee_10_15_kr.is_none() {
            self.fee_10_15_kr = defaults.fee_10_15_kr;
        }
        if self.fee_15_20_kr.is_none() {
            self.fee_15_20_kr = defaults.fee_15_20_kr;
        }
        if self.fee_20_25_kr.is_none() {
            self.fee_20_25_kr = defaults.fee_20_25_kr;
        }
        if self.fee_over_25_kr.is_none() {
            self.fee_over_25_kr = defaults.fee_over_25_kr;
        }
        if self.tiers.is_none() {
            self.tiers = defaults.tiers.clone();
        }
    }

    /// Build the effective, validated tier table
    ///
    /// A custom `tiers` array wins; otherwise the standard steps are priced
    /// from the step fields, with the documented defaults backing any field
    /// still absent.
    pub fn to_table(&self) -> Result<TierTable> {
        if let Some(specs) = &self.tiers {
            return TierTable::new(specs.iter().map(TierSpec::to_tier).collect());
        }
        TierTable::new(vec![
            CapacityTier::new(2.0, "0-2 kW", self.fee_0_2_kr.unwrap_or(DEFAULT_FEE_0_2_KR)),
            CapacityTier::new(5.0, "2-5 kW", self.fee_2_5_kr.unwrap_or(DEFAULT_FEE_2_5_KR)),
            CapacityTier::new(
                10.0,
                "5-10 kW",
                self.fee_5_10_kr.unwrap_or(DEFAULT_FEE_5_10_KR),
            ),
            CapacityTier::new(
                15.0,
                "10-15 kW",
                self.fee_10_15_kr.unwrap_or(DEFAULT_FEE_10_15_KR),
            ),
            CapacityTier::new(
                20.0,
                "15-20 kW",
                self.fee_15_20_kr.unwrap_or(DEFAULT_FEE_15_20_KR),
            ),
            CapacityTier::new(
                25.0,
                "20-25 kW",
                self.fee_20_25_kr.unwrap_or(DEFAULT_FEE_20_25_KR),
            ),
            CapacityTier::new(
                f64::INFINITY,
                "over 25 kW",
                self.fee_over_25_kr.unwrap_or(DEFAULT_FEE_OVER_25_KR),
            ),
        ])
    }
}
