//! Snapshot serialization of full World state to JSON.
//!
//! A snapshot is taken every `snapshot_interval` steps and on demand.
//! It is a read-only view after a completed step, used by external
//! visualization and diagnostics.

use crate::{
    firm::FirmState,
    fiscal::Government,
    household::HouseholdState,
    metrics::MarketStats,
    types::Step,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldSnapshot {
    pub step:       Step,
    pub government: Government,
    pub stats:      MarketStats,
    pub households: Vec<HouseholdState>,
    pub firms:      Vec<FirmState>,
}

impl WorldSnapshot {
    /// Firm count per tier, tier 1 first.
    pub fn tier_counts(&self, max_tier: u8) -> Vec<usize> {
        let mut counts = vec![0; max_tier as usize];
        for f in &self.firms {
            if let Some(slot) = (f.tier as usize).checked_sub(1).and_then(|i| counts.get_mut(i)) {
                *slot += 1;
            }
        }
        counts
    }

    /// Largest single-firm share of total employment.
    pub fn max_employment_share(&self) -> f64 {
        let total: usize = self.firms.iter().map(|f| f.employees_count).sum();
        if total == 0 {
            return 0.0;
        }
        let largest = self.firms.iter().map(|f| f.employees_count).max().unwrap_or(0);
        largest as f64 / total as f64
    }
}
