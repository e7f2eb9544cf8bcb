//! Firm entity: a producer and employer on a discrete growth ladder.
//!
//! Monthly order inside `Firm::step` is fixed:
//!   1. Pay tier overhead (square-root damped by price level)
//!   2. Attempt a tier upgrade (fourth-root damped cost)
//!   3. Depreciate inventory
//!   4. Re-price toward supply/demand, bounded by stickiness
//!   5. Re-set the wage offer from hiring outcome and profit
//!   6. Report bankruptcy (cash < 0)

use crate::{
    config::SimConfig,
    types::{FirmId, HouseholdId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Absolute price floor.
pub const PRICE_FLOOR: f64 = 0.1;
/// Price level that the damped cost scalings are measured against.
pub const REFERENCE_PRICE: f64 = 10.0;
/// Returns to scale on skill input.
pub const PRODUCTION_EXPONENT: f64 = 0.9;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Firm {
    pub id:            FirmId,
    pub cash:          f64,
    pub inventory:     f64,
    pub price:         f64,
    pub wage_offer:    f64,
    pub tier:          u8,
    pub max_employees: usize,
    /// Weak back-references into the household arena.
    pub employees:     BTreeSet<HouseholdId>,
    /// Never reset, not even by restructuring.
    pub bankruptcies:  u32,
    pub failed_to_hire: bool,

    pub last_profit:         f64,
    pub last_production:     f64,
    pub last_sales:          f64,
    pub total_sales_revenue: f64,

    // Current-month accounting, rolled into last_profit by step().
    pub period_revenue:   f64,
    pub period_wage_bill: f64,
}

/// What happened inside one `Firm::step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirmStepOutcome {
    pub overhead_paid: f64,
    /// (new tier, cost paid)
    pub upgraded:      Option<(u8, f64)>,
    pub bankrupt:      bool,
}

impl Firm {
    pub fn new(id: FirmId, config: &SimConfig) -> Self {
        Self {
            id,
            cash:           config.initial_cash_firm,
            inventory:      0.0,
            price:          config.initial_price,
            wage_offer:     config.initial_wage_offer,
            tier:           1,
            max_employees:  config.tier(1).max_employees,
            employees:      BTreeSet::new(),
            bankruptcies:   0,
            failed_to_hire: false,

            last_profit:         0.0,
            last_production:     0.0,
            last_sales:          0.0,
            total_sales_revenue: 0.0,

            period_revenue:   0.0,
            period_wage_bill: 0.0,
        }
    }

    /// Start-of-month reset of the per-step accounting.
    pub fn begin_period(&mut self) {
        self.last_sales = 0.0;
        self.period_revenue = 0.0;
        self.period_wage_bill = 0.0;
    }

    pub fn at_capacity(&self) -> bool {
        self.employees.len() >= self.max_employees
    }

    /// Cash needed to carry one more hire for the buffer period.
    pub fn hiring_cost(&self, config: &SimConfig) -> f64 {
        self.wage_offer * config.hiring_buffer_months
    }

    pub fn can_afford_hire(&self, config: &SimConfig) -> bool {
        self.cash > self.hiring_cost(config)
    }

    /// Production = productivity × (total skill)^0.9
    pub fn produce_goods(&mut self, total_skill_input: f64, config: &SimConfig) -> f64 {
        let production = config.avg_productivity * total_skill_input.max(0.0).powf(PRODUCTION_EXPONENT);
        self.inventory += production;
        self.last_production = production;
        production
    }

    /// Pay one employee the current offer. Returns the gross amount.
    pub fn pay_wage(&mut self) -> f64 {
        let gross = self.wage_offer;
        self.cash -= gross;
        self.period_wage_bill += gross;
        gross
    }

    /// Record a sale of `units` at the current price.
    pub fn sell(&mut self, units: f64) -> f64 {
        let revenue = units * self.price;
        self.cash += revenue;
        self.inventory -= units;
        self.last_sales += units;
        self.total_sales_revenue += revenue;
        self.period_revenue += revenue;
        revenue
    }

    fn price_ratio(&self) -> f64 {
        (self.price / REFERENCE_PRICE).max(1.0)
    }

    /// Monthly update for a solvent firm.
    pub fn step(&mut self, config: &SimConfig) -> FirmStepOutcome {
        let overhead_paid = self.pay_overhead(config);
        self.last_profit = self.period_revenue - self.period_wage_bill - overhead_paid;

        let upgraded = self.attempt_upgrade(config);

        self.inventory *= 1.0 - config.inventory_depreciation;

        self.reprice(config);
        self.reset_wage_offer(config);

        FirmStepOutcome {
            overhead_paid,
            upgraded,
            bankrupt: self.cash < 0.0,
        }
    }

    /// Overhead scales with the price level, damped by a square root so
    /// that inflation alone cannot kill a firm.
    fn pay_overhead(&mut self, config: &SimConfig) -> f64 {
        let overhead = config.tier(self.tier).overhead * self.price_ratio().sqrt();
        self.cash -= overhead;
        overhead
    }

    fn attempt_upgrade(&mut self, config: &SimConfig) -> Option<(u8, f64)> {
        if self.tier >= config.max_tier() {
            return None;
        }

        let next = self.tier + 1;
        let scaled_cost = config.tier(next).upgrade_cost * self.price_ratio().powf(0.25);

        if self.cash > scaled_cost * 1.5 {
            self.cash -= scaled_cost;
            self.tier = next;
            self.max_employees = config.tier(next).max_employees;
            Some((next, scaled_cost))
        } else {
            None
        }
    }

    fn reprice(&mut self, config: &SimConfig) {
        let safe_last_sales = self.last_sales.max(0.1);

        let target = if self.inventory > safe_last_sales * 2.0 {
            // Glut
            self.price * 0.95
        } else if self.inventory < safe_last_sales * 0.25 {
            if self.last_production > 0.0 || self.inventory > 0.0 {
                // Scarcity
                self.price * 1.05
            } else {
                // Nothing to sell: drift down to reset expectations.
                self.price * 0.98
            }
        } else {
            self.price
        };

        let max_step = self.price * config.price_stickiness;
        let change = (target - self.price).clamp(-max_step, max_step);
        self.price = (self.price + change).max(PRICE_FLOOR);
    }

    fn reset_wage_offer(&mut self, config: &SimConfig) {
        let sustainable_wage = self.price * config.avg_productivity * 0.9;

        if self.failed_to_hire {
            if self.wage_offer < sustainable_wage {
                self.wage_offer *= 1.10;
            }
        } else if self.last_profit > 0.0 && self.can_afford_hire(config) && !self.at_capacity() {
            self.wage_offer *= 1.02;
        } else if self.last_profit < 0.0 {
            self.wage_offer *= 0.98;
        }

        // Floor wins over the sustainable cap when the two cross.
        self.wage_offer = self.wage_offer.min(sustainable_wage).max(config.wage_floor());
        self.failed_to_hire = false;
    }

    /// Bankruptcy reset. Identity and the bankruptcy counter survive.
    pub fn restructure(&mut self, bailout_amount: f64, config: &SimConfig) {
        self.bankruptcies += 1;

        self.cash = bailout_amount;
        self.inventory = 0.0;
        self.employees.clear();
        self.last_profit = 0.0;

        self.tier = 1;
        self.max_employees = config.tier(1).max_employees;

        self.price = (self.price * 0.8).max(REFERENCE_PRICE);
        self.wage_offer = (self.wage_offer * 0.8).max(config.wage_floor());
        self.total_sales_revenue = 0.0;
    }

    pub fn snapshot(&self) -> FirmState {
        FirmState {
            id:                  self.id,
            cash:                self.cash,
            inventory:           self.inventory,
            price:               self.price,
            wage_offer:          self.wage_offer,
            tier:                self.tier,
            max_employees:       self.max_employees,
            employees:           self.employees.iter().copied().collect(),
            employees_count:     self.employees.len(),
            bankruptcies:        self.bankruptcies,
            failed_to_hire:      self.failed_to_hire,
            last_profit:         self.last_profit,
            last_production:     self.last_production,
            last_sales:          self.last_sales,
            total_sales_revenue: self.total_sales_revenue,
        }
    }
}

/// Read-only view of a firm, taken after a completed step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FirmState {
    pub id:                  FirmId,
    pub cash:                f64,
    pub inventory:           f64,
    pub price:               f64,
    pub wage_offer:          f64,
    pub tier:                u8,
    pub max_employees:       usize,
    pub employees:           Vec<HouseholdId>,
    pub employees_count:     usize,
    pub bankruptcies:        u32,
    pub failed_to_hire:      bool,
    pub last_profit:         f64,
    pub last_production:     f64,
    pub last_sales:          f64,
    pub total_sales_revenue: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firm() -> (Firm, SimConfig) {
        let config = SimConfig::default_test();
        (Firm::new(0, &config), config)
    }

    #[test]
    fn production_has_diminishing_returns() {
        let (mut f, config) = firm();
        let one = f.produce_goods(1.0, &config);
        assert!((one - 10.0).abs() < 1e-12);
        let four = f.produce_goods(4.0, &config);
        assert!(four < 40.0 && four > 30.0);
        assert_eq!(f.last_production, four);
        assert!((f.inventory - one - four).abs() < 1e-9);
    }

    #[test]
    fn upgrade_requires_one_and_a_half_times_cost() {
        let (mut f, config) = firm();
        f.cash = 29_000.0;
        f.step(&config);
        assert_eq!(f.tier, 1);

        f.cash = 31_000.0;
        let outcome = f.step(&config);
        assert_eq!(f.tier, 2);
        assert_eq!(f.max_employees, 20);
        assert_eq!(outcome.upgraded, Some((2, 20_000.0)));
        assert!((f.cash - 11_000.0).abs() < 1e-9);
    }

    #[test]
    fn top_tier_never_upgrades() {
        let (mut f, config) = firm();
        f.tier = 4;
        f.max_employees = 200;
        f.cash = 10_000_000.0;
        let outcome = f.step(&config);
        assert_eq!(outcome.upgraded, None);
        assert_eq!(f.tier, 4);
    }

    #[test]
    fn overhead_is_damped_by_price_level() {
        let (mut f, config) = firm();
        f.tier = 2;
        f.max_employees = 20;
        f.price = 40.0; // ratio 4 → sqrt 2
        f.cash = 1_000.0;
        let outcome = f.step(&config);
        assert!((outcome.overhead_paid - 400.0).abs() < 1e-9);
    }

    #[test]
    fn glut_cuts_price_by_at_most_stickiness() {
        let (mut f, config) = firm();
        f.inventory = 100.0;
        f.last_sales = 1.0;
        f.step(&config);
        assert!((f.price - 9.5).abs() < 1e-9);
    }

    #[test]
    fn scarcity_raises_price() {
        let (mut f, config) = firm();
        f.inventory = 1.0;
        f.last_sales = 50.0;
        f.step(&config);
        assert!((f.price - 10.5).abs() < 1e-9);
    }

    #[test]
    fn empty_firm_drifts_price_down() {
        let (mut f, config) = firm();
        f.step(&config);
        assert!((f.price - 9.8).abs() < 1e-9);
    }

    #[test]
    fn price_never_below_floor() {
        let (mut f, config) = firm();
        f.price = 0.1;
        f.step(&config);
        assert!(f.price >= PRICE_FLOOR);
    }

    #[test]
    fn failed_hire_raises_wage_toward_sustainable() {
        let (mut f, config) = firm();
        f.price = 20.0;
        f.inventory = 1.0;
        f.last_sales = 1.0; // no price change
        f.failed_to_hire = true;
        f.step(&config);
        assert!((f.wage_offer - 110.0).abs() < 1e-9);
        assert!(!f.failed_to_hire);
    }

    #[test]
    fn wage_offer_never_below_floor() {
        let (mut f, config) = firm();
        f.price = 1.0; // sustainable wage 9 is far below the floor
        f.step(&config);
        assert_eq!(f.wage_offer, config.wage_floor());
    }

    #[test]
    fn profit_includes_revenue_wages_and_overhead() {
        let (mut f, config) = firm();
        f.begin_period();
        f.inventory = 10.0;
        f.sell(5.0);
        f.pay_wage();
        f.step(&config);
        assert!((f.last_profit - (50.0 - 100.0)).abs() < 1e-9);
    }

    #[test]
    fn negative_cash_reports_bankrupt() {
        let (mut f, config) = firm();
        f.cash = -500.0;
        assert!(f.step(&config).bankrupt);
    }

    #[test]
    fn restructure_resets_operations_but_keeps_identity() {
        let (mut f, config) = firm();
        f.tier = 3;
        f.max_employees = 50;
        f.employees.extend([1, 2, 3]);
        f.price = 30.0;
        f.wage_offer = 200.0;
        f.inventory = 40.0;
        f.restructure(20_000.0, &config);

        assert_eq!(f.id, 0);
        assert_eq!(f.bankruptcies, 1);
        assert_eq!(f.cash, 20_000.0);
        assert_eq!(f.tier, 1);
        assert_eq!(f.max_employees, 5);
        assert!(f.employees.is_empty());
        assert_eq!(f.inventory, 0.0);
        assert!((f.price - 24.0).abs() < 1e-9);
        assert!((f.wage_offer - 160.0).abs() < 1e-9);
    }
}
