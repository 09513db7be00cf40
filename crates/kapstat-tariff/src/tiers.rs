//! Capacity tier table and lookup
//!
//! A tier table is an ordered sequence of power bands, each with an exclusive
//! upper bound in kW and a fixed monthly fee. Exactly one tier matches any
//! non-negative capacity value; the final tier is an unbounded sentinel
//! (`upper_kw = f64::INFINITY`) so the match can never miss. Lookup is pure:
//! it selects the first tier whose upper bound is strictly greater than the
//! input, and reports the headroom left before the next tier applies.
//!
//! # Examples
//! ```
//! use kapstat_tariff::tiers::default_table;
//!
//! let selection = default_table().tier_for(4.5);
//! assert_eq!(selection.tier.label, "2-5 kW");
//! assert_eq!(selection.margin_kw, 0.5);
//! ```

use kapstat_core::error::{KapstatError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One band of the capacity tier table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityTier {
    /// Exclusive upper bound in kW; `f64::INFINITY` for the sentinel tier
    pub upper_kw: f64,
    /// Human-readable band label, e.g. `"2-5 kW"`
    pub label: String,
    /// Fixed monthly fee in NOK
    pub fee_kr: f64,
}

impl CapacityTier {
    /// Create a tier
    pub fn new(upper_kw: f64, label: impl Into<String>, fee_kr: f64) -> Self {
        Self {
            upper_kw,
            label: label.into(),
            fee_kr,
        }
    }
}

/// The matched tier plus the remaining headroom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierSelection<'a> {
    /// The tier the capacity value falls into
    pub tier: &'a CapacityTier,
    /// Headroom in kW before the next tier applies, never negative
    pub margin_kw: f64,
}

/// Validated, ordered capacity tier table
///
/// Construction enforces the invariants lookup relies on: at least one tier,
/// strictly increasing upper bounds, finite non-negative fees. A table whose
/// last bound is finite is accepted; lookup then falls back to that last
/// tier for values beyond it.
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    tiers: Vec<CapacityTier>,
}

impl TierTable {
    /// Build a table, validating the tier sequence
    pub fn new(tiers: Vec<CapacityTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(KapstatError::InvalidTierTable(
                "table must contain at least one tier".to_string(),
            ));
        }
        for tier in &tiers {
            if tier.upper_kw.is_nan() || tier.upper_kw <= 0.0 {
                return Err(KapstatError::InvalidTierTable(format!(
                    "tier '{}' has invalid upper bound {}",
                    tier.label, tier.upper_kw
                )));
            }
            if !tier.fee_kr.is_finite() || tier.fee_kr < 0.0 {
                return Err(KapstatError::InvalidTierTable(format!(
                    "tier '{}' has invalid fee {}",
                    tier.label, tier.fee_kr
                )));
            }
        }
        for pair in tiers.windows(2) {
            if pair[1].upper_kw <= pair[0].upper_kw {
                return Err(KapstatError::InvalidTierTable(format!(
                    "upper bounds must be strictly increasing ('{}' after '{}')",
                    pair[1].label, pair[0].label
                )));
            }
        }
        Ok(Self { tiers })
    }

    /// The tiers in ascending order
    pub fn tiers(&self) -> &[CapacityTier] {
        &self.tiers
    }

    /// Select the tier for a capacity value
    ///
    /// The match condition is strict `<`: a value exactly on a bound belongs
    /// to the next tier up. Margin is the distance to the matched tier's
    /// upper bound, floored at zero.
    pub fn tier_for(&self, avg_kw: f64) -> TierSelection<'_> {
        for tier in &self.tiers {
            if avg_kw < tier.upper_kw {
                return TierSelection {
                    tier,
                    margin_kw: (tier.upper_kw - avg_kw).max(0.0),
                };
            }
        }
        // With an unbounded sentinel this is unreachable; a fully bounded
        // table still answers with its highest tier.
        let tier = &self.tiers[self.tiers.len() - 1];
        TierSelection {
            tier,
            margin_kw: (tier.upper_kw - avg_kw).max(0.0),
        }
    }
}

static DEFAULT_TABLE: Lazy<TierTable> = Lazy::new(|| {
    TierTable::new(vec![
        CapacityTier::new(2.0, "0-2 kW", 125.0),
        CapacityTier::new(5.0, "2-5 kW", 190.0),
        CapacityTier::new(10.0, "5-10 kW", 300.0),
        CapacityTier::new(15.0, "10-15 kW", 420.0),
        CapacityTier::new(20.0, "15-20 kW", 535.0),
        CapacityTier::new(25.0, "20-25 kW", 650.0),
        CapacityTier::new(f64::INFINITY, "over 25 kW", 1250.0),
    ])
    .unwrap_or_else(|_| {
        // The built-in table is statically valid; keep a minimal fallback
        // rather than panicking in a Lazy initializer.
        TierTable {
            tiers: vec![CapacityTier::new(f64::INFINITY, "over 0 kW", 0.0)],
        }
    })
});

/// The built-in tier table with the standard Norwegian capacity steps
pub fn default_table() -> &'static TierTable {
    &DEFAULT_TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TierTable {
        TierTable::new(vec![
            CapacityTier::new(2.0, "T1", 125.0),
            CapacityTier::new(5.0, "T2", 190.0),
            CapacityTier::new(10.0, "T3", 300.0),
            CapacityTier::new(f64::INFINITY, "T4", 600.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_tier_for_mid_band() {
        let table = table();
        let selection = table.tier_for(4.5);
        assert_eq!(selection.tier.label, "T2");
        assert_eq!(selection.tier.fee_kr, 190.0);
        assert!((selection.margin_kw - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_value_belongs_to_next_tier() {
        // Strict <: exactly 2.0 is no longer in T1
        let table = table();
        let selection = table.tier_for(2.0);
        assert_eq!(selection.tier.label, "T2");
        assert_eq!(selection.margin_kw, 3.0);
    }

    #[test]
    fn test_zero_matches_first_tier() {
        let table = table();
        let selection = table.tier_for(0.0);
        assert_eq!(selection.tier.label, "T1");
        assert_eq!(selection.margin_kw, 2.0);
    }

    #[test]
    fn test_sentinel_catches_everything() {
        let table = table();
        let selection = table.tier_for(1e9);
        assert_eq!(selection.tier.label, "T4");
        assert_eq!(selection.margin_kw, f64::INFINITY);
    }

    #[test]
    fn test_bounded_table_falls_back_to_last_tier() {
        let table = TierTable::new(vec![
            CapacityTier::new(2.0, "T1", 125.0),
            CapacityTier::new(5.0, "T2", 190.0),
        ])
        .unwrap();
        let selection = table.tier_for(7.0);
        assert_eq!(selection.tier.label, "T2");
        // Margin floors at zero instead of going negative
        assert_eq!(selection.margin_kw, 0.0);
    }

    #[test]
    fn test_validation_rejects_empty() {
        assert!(TierTable::new(vec![]).is_err());
    }

    #[test]
    fn test_validation_rejects_unordered_bounds() {
        let result = TierTable::new(vec![
            CapacityTier::new(5.0, "T1", 125.0),
            CapacityTier::new(2.0, "T2", 190.0),
        ]);
        assert!(result.is_err());

        let result = TierTable::new(vec![
            CapacityTier::new(5.0, "T1", 125.0),
            CapacityTier::new(5.0, "T2", 190.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_numbers() {
        assert!(TierTable::new(vec![CapacityTier::new(f64::NAN, "T1", 125.0)]).is_err());
        assert!(TierTable::new(vec![CapacityTier::new(0.0, "T1", 125.0)]).is_err());
        assert!(TierTable::new(vec![CapacityTier::new(2.0, "T1", -1.0)]).is_err());
        assert!(TierTable::new(vec![CapacityTier::new(2.0, "T1", f64::NAN)]).is_err());
    }

    #[test]
    fn test_default_table_covers_all_inputs() {
        let table = default_table();
        assert_eq!(table.tiers().len(), 7);
        for kw in [0.0, 1.9, 2.0, 7.5, 24.9, 25.0, 400.0] {
            let selection = table.tier_for(kw);
            assert!(selection.margin_kw >= 0.0);
            assert!(selection.tier.fee_kr > 0.0);
        }
        assert_eq!(table.tier_for(400.0).tier.label, "over 25 kW");
    }

    #[test]
    fn test_lookup_is_pure() {
        let table = table();
        let first = table.tier_for(4.5);
        let second = table.tier_for(4.5);
        assert_eq!(first.tier, second.tier);
        assert_eq!(first.margin_kw, second.margin_kw);
    }
}
