//! Capacity tier table and tariff configuration for kapstat
//!
//! This crate turns user-editable tariff numbers into a validated tier
//! table and answers the pure lookup: which band does a capacity value fall
//! into, what does it cost, and how much headroom is left.

pub mod options;
pub mod tiers;

pub use options::{TariffOptions, TierSpec};
pub use tiers::{CapacityTier, TierSelection, TierTable, default_table};
