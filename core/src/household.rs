//! Household entity: a consumer and worker.
//!
//! Each month a household eats one unit of goods, gains or loses skill
//! depending on employment, and re-prices its labor (reservation wage).

use crate::{
    config::SimConfig,
    types::{FirmId, HouseholdId},
};
use serde::{Deserialize, Serialize};

/// Monthly skill growth while employed (~1.2% per year).
pub const SKILL_GROWTH: f64 = 1.001;
/// Monthly skill atrophy once long-term unemployed.
pub const SKILL_ATROPHY: f64 = 0.999;
/// Months unemployed after which skill starts to atrophy.
pub const ATROPHY_AFTER_MONTHS: u32 = 12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Household {
    pub id:                 HouseholdId,
    pub cash:               f64,
    pub skill:              f64,
    pub inventory:          f64,
    pub employer:           Option<FirmId>,
    /// Gross wage last paid (or agreed at hire).
    pub wage:               f64,
    pub reservation_wage:   f64,
    pub is_employed:        bool,
    pub months_unemployed:  u32,
    pub contract_remaining: u32,
    pub subsistence_failed: bool,
}

impl Household {
    pub fn new(id: HouseholdId, config: &SimConfig) -> Self {
        Self {
            id,
            cash:               config.initial_cash_household,
            skill:              config.initial_skill,
            inventory:          0.0,
            employer:           None,
            wage:               0.0,
            reservation_wage:   config.wage_floor(),
            is_employed:        false,
            months_unemployed:  0,
            contract_remaining: 0,
            subsistence_failed: false,
        }
    }

    /// Eat one unit. Inventory above the cap spoils first.
    /// A shortfall is recorded, never retried.
    pub fn consume(&mut self, max_inventory: f64) {
        if self.inventory > max_inventory {
            self.inventory = max_inventory;
        }

        if self.inventory >= 1.0 {
            self.inventory -= 1.0;
            self.subsistence_failed = false;
        } else {
            self.inventory = 0.0;
            self.subsistence_failed = true;
        }
    }

    /// Monthly internal update: consumption, skill, reservation wage.
    pub fn step(&mut self, inflation_rate: f64, config: &SimConfig) {
        self.consume(config.max_household_inventory);

        if self.is_employed {
            self.skill *= SKILL_GROWTH;
            self.months_unemployed = 0;
            self.contract_remaining = self.contract_remaining.saturating_sub(1);
        } else {
            self.months_unemployed += 1;
            if self.months_unemployed > ATROPHY_AFTER_MONTHS {
                self.skill *= SKILL_ATROPHY;
            }
        }

        self.adjust_reservation_wage(inflation_rate, config);
    }

    /// Cost-of-living adjustment first, then market dynamics.
    /// Both may apply in the same month.
    fn adjust_reservation_wage(&mut self, inflation_rate: f64, config: &SimConfig) {
        let floor = config.wage_floor();

        if inflation_rate > 0.0 {
            self.reservation_wage *= 1.0 + inflation_rate;
        }

        if !self.is_employed {
            if self.months_unemployed > 6 {
                self.reservation_wage = (self.reservation_wage * 0.90).max(floor);
            } else if self.months_unemployed > 3 {
                self.reservation_wage = (self.reservation_wage * 0.98).max(floor);
            }
        }

        if self.is_employed && self.cash > config.subsistence_cost * 6.0 {
            self.reservation_wage *= 1.02;
        }
    }

    /// Take a job. Contract starts fresh.
    pub fn hire(&mut self, firm: FirmId, wage: f64, contract_months: u32) {
        self.is_employed = true;
        self.employer = Some(firm);
        self.wage = wage;
        self.contract_remaining = contract_months;
    }

    /// Clear all employment fields. The caller updates the roster.
    pub fn lay_off(&mut self) {
        self.is_employed = false;
        self.employer = None;
        self.wage = 0.0;
        self.contract_remaining = 0;
    }

    /// Looking for work: unemployed, or the contract has run out.
    pub fn is_job_seeker(&self) -> bool {
        !self.is_employed || self.contract_remaining == 0
    }

    pub fn snapshot(&self) -> HouseholdState {
        HouseholdState {
            id:                 self.id,
            cash:               self.cash,
            skill:              self.skill,
            inventory:          self.inventory,
            employer:           self.employer,
            employed:           self.is_employed,
            wage:               self.wage,
            reservation_wage:   self.reservation_wage,
            months_unemployed:  self.months_unemployed,
            contract_remaining: self.contract_remaining,
            subsistence_failed: self.subsistence_failed,
        }
    }
}

/// Read-only view of a household, taken after a completed step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HouseholdState {
    pub id:                 HouseholdId,
    pub cash:               f64,
    pub skill:              f64,
    pub inventory:          f64,
    pub employer:           Option<FirmId>,
    pub employed:           bool,
    pub wage:               f64,
    pub reservation_wage:   f64,
    pub months_unemployed:  u32,
    pub contract_remaining: u32,
    pub subsistence_failed: bool,
}
