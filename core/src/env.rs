//! Control-policy environment: the step/observe/reward surface an
//! external controller (learned or human) drives.
//!
//! Actions arrive normalized to [0,1]³ and are scaled to fiscal ranges.
//! Observations are the seven market statistics, sanitized so that a
//! numeric blow-up never reaches the controller as NaN or infinity.

use crate::{
    engine::SimEngine,
    error::SimResult,
    fiscal::FiscalPolicy,
    metrics::MarketStats,
    types::Step,
};
use serde::{Deserialize, Serialize};

pub const OBSERVATION_LEN: usize = 7;
/// Unemployment above this after the first few steps counts as collapse.
pub const COLLAPSE_UNEMPLOYMENT: f64 = 0.95;
pub const COLLAPSE_GRACE_STEPS: Step = 5;
pub const COLLAPSE_PENALTY: f64 = 50.0;
pub const UNEMPLOYMENT_WEIGHT: f64 = 10.0;

/// `[unemployment, avg_price, avg_wage, tax_revenue, gdp, gini, subsistence_failures]`
pub type Observation = [f32; OBSERVATION_LEN];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward:      f64,
    /// Never set: the economy is allowed to recover from collapse.
    pub terminated:  bool,
    /// Set once the episode length is reached.
    pub truncated:   bool,
    pub stats:       MarketStats,
}

pub struct EconomyEnv {
    engine:       SimEngine,
    current_step: Step,
}

impl EconomyEnv {
    pub fn new(engine: SimEngine) -> Self {
        Self {
            engine,
            current_step: 0,
        }
    }

    pub fn engine(&self) -> &SimEngine {
        &self.engine
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn reset(&mut self, seed: u64) -> SimResult<Observation> {
        let stats = self.engine.reset(seed)?;
        self.current_step = 0;
        Ok(observe(&stats))
    }

    /// Run the hands-off policy before the controller takes over.
    /// Warmup steps do not count toward the episode.
    pub fn warmup(&mut self, steps: u64) -> SimResult<Observation> {
        self.engine.run_steps(steps, FiscalPolicy::default())?;
        Ok(observe(&self.engine.get_market_stats()))
    }

    pub fn step(&mut self, action: [f64; 3]) -> SimResult<StepOutcome> {
        self.engine.step(FiscalPolicy::from_normalized(action))?;
        self.current_step += 1;

        let stats = self.engine.get_market_stats();
        Ok(StepOutcome {
            observation: observe(&stats),
            reward:      reward(&stats, self.current_step),
            terminated:  false,
            truncated:   self.current_step >= self.engine.config().episode_length,
            stats,
        })
    }
}

pub fn observe(stats: &MarketStats) -> Observation {
    [
        stats.unemployment,
        stats.avg_price,
        stats.avg_wage,
        stats.tax_revenue,
        stats.gdp,
        stats.gini,
        stats.subsistence_failures as f64,
    ]
    .map(sanitize)
}

/// Narrow to f32 first so that finite values beyond f32 range are caught too.
fn sanitize(value: f64) -> f32 {
    let narrowed = value as f32;
    if narrowed.is_nan() {
        0.0
    } else if narrowed == f32::INFINITY {
        1e6
    } else if narrowed == f32::NEG_INFINITY {
        -1e6
    } else {
        narrowed
    }
}

pub fn reward(stats: &MarketStats, step: Step) -> f64 {
    let mut reward = -stats.unemployment * UNEMPLOYMENT_WEIGHT;
    if stats.unemployment > COLLAPSE_UNEMPLOYMENT && step > COLLAPSE_GRACE_STEPS {
        reward -= COLLAPSE_PENALTY;
    }
    reward
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(unemployment: f64) -> MarketStats {
        MarketStats { unemployment, ..MarketStats::initial(10.0, 100.0) }
    }

    #[test]
    fn non_finite_values_are_sanitized() {
        let s = MarketStats {
            gdp: f64::NAN,
            avg_price: f64::INFINITY,
            avg_wage: f64::NEG_INFINITY,
            ..stats(0.5)
        };
        let obs = observe(&s);
        assert_eq!(obs[0], 0.5);
        assert_eq!(obs[1], 1e6);
        assert_eq!(obs[2], -1e6);
        assert_eq!(obs[4], 0.0);
    }

    #[test]
    fn values_beyond_f32_range_are_clipped() {
        let s = MarketStats {
            tax_revenue: 1e39,
            gdp: -1e39,
            ..stats(0.1)
        };
        let obs = observe(&s);
        assert_eq!(obs[3], 1e6);
        assert_eq!(obs[4], -1e6);
        assert!(obs.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn collapse_penalty_only_after_grace() {
        assert_eq!(reward(&stats(1.0), 3), -10.0);
        assert_eq!(reward(&stats(1.0), 6), -60.0);
        assert_eq!(reward(&stats(0.2), 50), -2.0);
    }
}
