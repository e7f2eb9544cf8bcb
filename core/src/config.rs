//! Simulation configuration.
//!
//! Every constant the core reads lives here. `SimConfig::load` reads a
//! JSON file; missing fields fall back to the defaults below, so a file
//! only needs to name what it overrides.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// One rung of the firm growth ladder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TierConfig {
    pub max_employees: usize,
    /// One-time cost to upgrade INTO this tier.
    pub upgrade_cost:  f64,
    /// Recurring monthly cost while at this tier.
    pub overhead:      f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // ── Population ───────────────────────────────
    pub n_households: usize,
    pub n_firms:      usize,

    // ── Economic parameters ──────────────────────
    /// Minimum monthly consumption value. Doubles as the wage floor.
    pub subsistence_cost:       f64,
    pub avg_productivity:       f64,
    pub initial_cash_household: f64,
    pub initial_skill:          f64,
    pub initial_cash_firm:      f64,
    pub initial_price:          f64,
    pub initial_wage_offer:     f64,
    pub initial_govt_cash:      f64,

    // ── Stability constraints ────────────────────
    /// Max fractional price change per step.
    pub price_stickiness:        f64,
    /// Months of wages a firm must hold in cash to hire.
    pub hiring_buffer_months:    f64,
    pub inventory_depreciation:  f64,
    pub contract_months:         u32,
    pub max_household_inventory: f64,

    // ── Government backstops ─────────────────────
    pub min_bailout:       f64,
    pub revival_grant:     f64,
    pub min_solvent_firms: usize,

    // ── Goods market ─────────────────────────────
    pub shopping_search_size: usize,

    // ── Controller / run parameters ──────────────
    pub episode_length:    u64,
    pub warmup_steps:      u64,
    pub random_seed:       u64,
    pub snapshot_interval: u64,

    /// Tier 1 first. Index 0 is tier 1.
    pub tiers: Vec<TierConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n_households: 100,
            n_firms:      10,

            subsistence_cost:       100.0,
            avg_productivity:       10.0,
            initial_cash_household: 500.0,
            initial_skill:          1.0,
            initial_cash_firm:      100_000.0,
            initial_price:          10.0,
            initial_wage_offer:     100.0,
            initial_govt_cash:      100_000.0,

            price_stickiness:        0.05,
            hiring_buffer_months:    3.0,
            inventory_depreciation:  0.10,
            contract_months:         6,
            max_household_inventory: 24.0,

            min_bailout:       20_000.0,
            revival_grant:     20_000.0,
            min_solvent_firms: 2,

            shopping_search_size: 3,

            episode_length:    360, // 30 years
            warmup_steps:      50,
            random_seed:       42,
            snapshot_interval: 12, // yearly

            tiers: vec![
                TierConfig { max_employees: 5,   upgrade_cost: 0.0,       overhead: 0.0 },
                TierConfig { max_employees: 20,  upgrade_cost: 20_000.0,  overhead: 200.0 },
                TierConfig { max_employees: 50,  upgrade_cost: 100_000.0, overhead: 2_000.0 },
                TierConfig { max_employees: 200, upgrade_cost: 500_000.0, overhead: 10_000.0 },
            ],
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Fields absent from the file keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    /// Workers never accept less than survival cost.
    pub fn wage_floor(&self) -> f64 {
        self.subsistence_cost
    }

    pub fn max_tier(&self) -> u8 {
        self.tiers.len() as u8
    }

    /// Tier table lookup. Tiers are 1-based.
    pub fn tier(&self, tier: u8) -> &TierConfig {
        let idx = (tier.max(1) as usize - 1).min(self.tiers.len() - 1);
        &self.tiers[idx]
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.tiers.is_empty() {
            return Err(invalid("tier table is empty"));
        }
        if self.tiers.len() > u8::MAX as usize {
            return Err(invalid("tier table has more than 255 tiers"));
        }
        if let Some(pos) = self.tiers.iter().position(|t| t.max_employees == 0) {
            return Err(invalid(&format!("tier {} has zero capacity", pos + 1)));
        }
        if self.subsistence_cost <= 0.0 {
            return Err(invalid("subsistence_cost must be positive"));
        }
        if self.initial_price <= 0.0 {
            return Err(invalid("initial_price must be positive"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> SimError {
    SimError::InvalidConfig { reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "n_households": 7, "ubi_unused": 1 }"#).unwrap();
        assert_eq!(config.n_households, 7);
        assert_eq!(config.n_firms, 10);
        assert_eq!(config.tiers.len(), 4);
    }

    #[test]
    fn empty_tier_table_rejected() {
        let config = SimConfig { tiers: vec![], ..SimConfig::default() };
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn tier_lookup_is_one_based() {
        let config = SimConfig::default();
        assert_eq!(config.tier(1).max_employees, 5);
        assert_eq!(config.tier(4).max_employees, 200);
        assert_eq!(config.max_tier(), 4);
    }
}
