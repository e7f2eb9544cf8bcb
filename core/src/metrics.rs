//! Market statistics derived from current agent state.

use crate::{firm::Firm, household::Household};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketStats {
    pub unemployment:         f64,
    pub avg_price:            f64,
    pub avg_wage:             f64,
    /// Cumulative since reset.
    pub tax_revenue:          f64,
    pub gdp:                  f64,
    pub gini:                 f64,
    pub subsistence_failures: usize,
}

impl MarketStats {
    /// Stats reported before the first step.
    pub fn initial(initial_price: f64, initial_wage: f64) -> Self {
        Self {
            unemployment:         1.0,
            avg_price:            initial_price,
            avg_wage:             initial_wage,
            tax_revenue:          0.0,
            gdp:                  0.0,
            gini:                 0.0,
            subsistence_failures: 0,
        }
    }

    pub fn compute(households: &[Household], firms: &[Firm], tax_revenue: f64) -> Self {
        let unemployed = households.iter().filter(|h| !h.is_employed).count();

        // Income approach: wages of the employed plus firm profits.
        let total_wages: f64 = households
            .iter()
            .filter(|h| h.is_employed)
            .map(|h| h.wage)
            .sum();
        let total_profits: f64 = firms.iter().map(|f| f.last_profit).sum();

        let mut wealth: Vec<f64> = households.iter().map(|h| h.cash).collect();

        Self {
            unemployment:         ratio(unemployed as f64, households.len()),
            avg_price:            mean(firms.iter().map(|f| f.price)),
            avg_wage:             mean(firms.iter().map(|f| f.wage_offer)),
            tax_revenue,
            gdp:                  total_wages + total_profits,
            gini:                 gini(&mut wealth),
            subsistence_failures: households.iter().filter(|h| h.subsistence_failed).count(),
        }
    }
}

fn ratio(numerator: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        numerator / n as f64
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    ratio(sum, n)
}

/// Gini coefficient over wealth. Sorts in place.
/// Zero for an empty population or non-positive total wealth.
/// Clamped to [0, 1]; stray negative balances cannot push it outside.
pub fn gini(wealth: &mut [f64]) -> f64 {
    let n = wealth.len();
    if n == 0 {
        return 0.0;
    }
    wealth.sort_by(f64::total_cmp);

    let total: f64 = wealth.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let weighted: f64 = wealth
        .iter()
        .enumerate()
        .map(|(i, w)| (2.0 * (i + 1) as f64 - n as f64 - 1.0) * w)
        .sum();
    (weighted / (n as f64 * total)).clamp(0.0, 1.0)
}
