//! The World: one isolated economy and its five-phase monthly step.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Production      firms produce with last month's workforce, pay wages
//!   2. Labor market    seekers re-matched against a frozen set of offers
//!   3. Goods market    households spend post-wage cash on inventories
//!   4. Fiscal          UBI against the post-sale reserve
//!   5. Internal        household/firm updates, bankruptcy, safety net
//!
//! RULES:
//!   - No phase starts before the previous one has settled the whole population.
//!   - All randomness flows through the World's single SimRng.
//!   - Cross-links (employer, rosters) are plain ids, updated on both sides
//!     inside the phase that changes them.

use crate::{
    config::SimConfig,
    event::SimEvent,
    fiscal::{self, FiscalPolicy, Government},
    firm::{Firm, FirmState},
    goods_market,
    household::{Household, HouseholdState},
    labor_market,
    metrics::MarketStats,
    rng::SimRng,
    snapshot::WorldSnapshot,
    types::{FirmId, HouseholdId, Step},
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Engine,
    Production,
    LaborMarket,
    GoodsMarket,
    Fiscal,
    Internal,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Engine      => "engine",
            Self::Production  => "production",
            Self::LaborMarket => "labor_market",
            Self::GoodsMarket => "goods_market",
            Self::Fiscal      => "fiscal",
            Self::Internal    => "internal",
        }
    }
}

pub struct World {
    pub config:     SimConfig,
    pub step:       Step,
    pub households: Vec<Household>,
    pub firms:      Vec<Firm>,
    pub government: Government,
    pub stats:      MarketStats,
    rng:            SimRng,
}

impl World {
    /// Fresh population with default per-entity state.
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let households = (0..config.n_households)
            .map(|id| Household::new(id, &config))
            .collect();
        let firms = (0..config.n_firms).map(|id| Firm::new(id, &config)).collect();

        Self {
            step: 0,
            households,
            firms,
            government: Government::new(&config),
            stats: MarketStats::initial(config.initial_price, config.initial_wage_offer),
            rng: SimRng::new(seed),
            config,
        }
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Advance one month. Infallible: every degenerate condition is
    /// absorbed by numeric policy.
    pub fn step(&mut self, policy: FiscalPolicy) -> Vec<(Phase, SimEvent)> {
        self.step += 1;
        let step = self.step;

        let applied = policy.clamped();
        if applied != policy {
            log::warn!("step={step} fiscal: policy {policy:?} clamped to {applied:?}");
        }

        let mut events = vec![
            (Phase::Engine, SimEvent::StepStarted { step }),
            (
                Phase::Fiscal,
                SimEvent::PolicyApplied {
                    step,
                    income_tax_rate: applied.income_tax_rate,
                    corp_tax_rate:   applied.corp_tax_rate,
                    ubi_amount:      applied.ubi_amount,
                },
            ),
        ];

        let tag = |phase: Phase, evs: Vec<SimEvent>| evs.into_iter().map(move |e| (phase, e));

        events.extend(tag(Phase::Production, self.run_production(applied.income_tax_rate)));
        events.extend(tag(
            Phase::LaborMarket,
            labor_market::clear(step, &mut self.households, &mut self.firms, &self.config, &mut self.rng),
        ));
        events.extend(tag(
            Phase::GoodsMarket,
            goods_market::clear(step, &mut self.households, &mut self.firms, &self.config, &mut self.rng),
        ));
        events.extend(tag(Phase::Fiscal, self.run_fiscal(&applied)));
        events.extend(tag(Phase::Internal, self.run_internal_updates()));

        self.stats = MarketStats::compute(&self.households, &self.firms, self.government.tax_revenue);
        events.push((
            Phase::Engine,
            SimEvent::StatsComputed {
                step,
                unemployment:         self.stats.unemployment,
                avg_price:            self.stats.avg_price,
                avg_wage:             self.stats.avg_wage,
                gdp:                  self.stats.gdp,
                gini:                 self.stats.gini,
                subsistence_failures: self.stats.subsistence_failures,
            },
        ));
        events.push((Phase::Engine, SimEvent::StepCompleted { step }));

        events
    }

    /// Phase 1: produce with the current roster, then pay every employee
    /// the firm's current offer, withholding income tax at source.
    fn run_production(&mut self, income_tax_rate: f64) -> Vec<SimEvent> {
        let step = self.step;
        let mut units_produced = 0.0;
        let mut wages_paid = 0.0;
        let tax_before = self.government.tax_revenue;

        for firm in &mut self.firms {
            firm.begin_period();

            let total_skill: f64 = firm
                .employees
                .iter()
                .filter_map(|&hid| self.households.get(hid))
                .map(|h| h.skill)
                .sum();
            units_produced += firm.produce_goods(total_skill, &self.config);

            let roster: Vec<HouseholdId> = firm.employees.iter().copied().collect();
            for hid in roster {
                let Some(household) = self.households.get_mut(hid) else {
                    continue;
                };
                let gross = firm.pay_wage();
                household.cash += self.government.withhold_income_tax(gross, income_tax_rate);
                household.wage = gross;
                wages_paid += gross;
            }
        }

        let income_tax_withheld = self.government.tax_revenue - tax_before;
        log::debug!(
            "step={step} production: units={units_produced:.1} wages={wages_paid:.2} tax={income_tax_withheld:.2}"
        );

        vec![SimEvent::ProductionCompleted {
            step,
            units_produced,
            wages_paid,
            income_tax_withheld,
        }]
    }

    /// Phase 4: transfers. Corporate tax is accepted but deliberately
    /// not applied to firm cash or profit.
    fn run_fiscal(&mut self, policy: &FiscalPolicy) -> Vec<SimEvent> {
        if policy.corp_tax_rate > 0.0 {
            log::trace!(
                "step={} fiscal: corp_tax_rate={:.3} has no effect",
                self.step,
                policy.corp_tax_rate
            );
        }
        fiscal::pay_ubi(self.step, &mut self.households, &mut self.government, policy.ubi_amount)
    }

    /// Phase 5: households, then firms (bankruptcy resolved in place),
    /// then the market-wide solvency net.
    fn run_internal_updates(&mut self) -> Vec<SimEvent> {
        let step = self.step;
        let mut events = Vec::new();

        let prev_avg_price = self.stats.avg_price;
        let current_avg_price = mean_price(&self.firms);
        let inflation_rate = if prev_avg_price > 0.0 {
            (current_avg_price - prev_avg_price) / prev_avg_price
        } else {
            0.0
        };

        for household in &mut self.households {
            household.step(inflation_rate, &self.config);
        }

        for fid in 0..self.firms.len() {
            let firm = &mut self.firms[fid];
            let bankrupt = if firm.cash < 0.0 {
                true
            } else {
                let outcome = firm.step(&self.config);
                if let Some((tier, cost)) = outcome.upgraded {
                    log::info!("step={step} firm {fid}: upgraded to tier {tier} for {cost:.2}");
                    events.push(SimEvent::FirmUpgraded { step, firm_id: fid, tier, cost });
                }
                outcome.bankrupt
            };

            if bankrupt {
                events.extend(fiscal::resolve_bankruptcy(
                    step,
                    &mut self.firms[fid],
                    &mut self.households,
                    &mut self.government,
                    &self.config,
                ));
            }
        }

        events.extend(fiscal::solvency_safety_net(
            step,
            &mut self.firms,
            &mut self.households,
            &mut self.government,
            &self.config,
        ));

        events
    }

    pub fn household_state(&self, id: HouseholdId) -> Option<HouseholdState> {
        self.households.get(id).map(Household::snapshot)
    }

    pub fn firm_state(&self, id: FirmId) -> Option<FirmState> {
        self.firms.get(id).map(Firm::snapshot)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            step:       self.step,
            government: self.government.clone(),
            stats:      self.stats.clone(),
            households: self.households.iter().map(Household::snapshot).collect(),
            firms:      self.firms.iter().map(Firm::snapshot).collect(),
        }
    }

    /// Post-step invariants. Empty when the World is consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let floor = self.config.wage_floor();

        for f in &self.firms {
            if f.employees.len() > f.max_employees {
                problems.push(format!("firm {} roster {} > max {}", f.id, f.employees.len(), f.max_employees));
            }
            if f.price < crate::firm::PRICE_FLOOR {
                problems.push(format!("firm {} price {} below floor", f.id, f.price));
            }
            if f.wage_offer < floor {
                problems.push(format!("firm {} wage offer {} below floor", f.id, f.wage_offer));
            }
        }

        for h in &self.households {
            if !(0.0..=self.config.max_household_inventory).contains(&h.inventory) {
                problems.push(format!("household {} inventory {} out of range", h.id, h.inventory));
            }

            let rosters: Vec<FirmId> = self
                .firms
                .iter()
                .filter(|f| f.employees.contains(&h.id))
                .map(|f| f.id)
                .collect();
            let consistent = match (h.is_employed, h.employer) {
                (true, Some(fid)) => rosters == [fid],
                (false, None) => rosters.is_empty(),
                _ => false,
            };
            if !consistent {
                problems.push(format!(
                    "household {} employed={} employer={:?} listed by {:?}",
                    h.id, h.is_employed, h.employer, rosters
                ));
            }
        }

        problems
    }
}

fn mean_price(firms: &[Firm]) -> f64 {
    if firms.is_empty() {
        0.0
    } else {
        firms.iter().map(|f| f.price).sum::<f64>() / firms.len() as f64
    }
}
