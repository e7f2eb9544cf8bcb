//! Fiscal authority: income tax, UBI, bailouts, and the solvency net.
//!
//! The government never fails. When the reserve cannot cover a
//! transfer, UBI is paid pro rata (austerity) and bailouts are issued
//! unfunded (emergency money creation).

use crate::{
    config::SimConfig,
    event::{LayoffReason, SimEvent},
    firm::Firm,
    household::Household,
    types::{FirmId, Step},
};
use serde::{Deserialize, Serialize};

pub const MAX_INCOME_TAX: f64 = 0.8;
pub const MAX_CORP_TAX: f64 = 0.8;
pub const MAX_UBI: f64 = 200.0;

/// Per-step fiscal action supplied by the external controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FiscalPolicy {
    pub income_tax_rate: f64,
    /// Accepted and logged, but has no effect on firm cash or profit.
    pub corp_tax_rate:   f64,
    pub ubi_amount:      f64,
}

impl Default for FiscalPolicy {
    /// The hands-off policy used for warmup and smoke runs.
    fn default() -> Self {
        Self {
            income_tax_rate: 0.2,
            corp_tax_rate:   0.2,
            ubi_amount:      0.0,
        }
    }
}

impl FiscalPolicy {
    pub fn new(income_tax_rate: f64, corp_tax_rate: f64, ubi_amount: f64) -> Self {
        Self { income_tax_rate, corp_tax_rate, ubi_amount }
    }

    /// Scale a controller action in [0,1]³ to policy ranges.
    pub fn from_normalized(action: [f64; 3]) -> Self {
        Self {
            income_tax_rate: action[0] * MAX_INCOME_TAX,
            corp_tax_rate:   action[1] * MAX_CORP_TAX,
            ubi_amount:      action[2] * MAX_UBI,
        }
        .clamped()
    }

    /// Clamp every field into its legal range. NaN becomes 0.
    pub fn clamped(self) -> Self {
        Self {
            income_tax_rate: clamp_or_zero(self.income_tax_rate, MAX_INCOME_TAX),
            corp_tax_rate:   clamp_or_zero(self.corp_tax_rate, MAX_CORP_TAX),
            ubi_amount:      clamp_or_zero(self.ubi_amount, MAX_UBI),
        }
    }
}

fn clamp_or_zero(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

/// The singleton treasury.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Government {
    pub cash:        f64,
    /// Cumulative income tax collected since reset.
    pub tax_revenue: f64,
}

impl Government {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            cash:        config.initial_govt_cash,
            tax_revenue: 0.0,
        }
    }

    /// Withhold income tax on a gross wage. Returns the net wage.
    pub fn withhold_income_tax(&mut self, gross_wage: f64, rate: f64) -> f64 {
        let tax = gross_wage * rate;
        self.tax_revenue += tax;
        gross_wage - tax
    }

    /// Try to fund `amount` from the reserve. Returns whether it was funded.
    /// Unfunded grants are still paid by the caller; they are not debited.
    fn fund(&mut self, amount: f64) -> bool {
        if self.cash >= amount {
            self.cash -= amount;
            true
        } else {
            false
        }
    }
}

/// Distribute UBI, pro rata if the reserve cannot cover it.
pub fn pay_ubi(
    step: Step,
    households: &mut [Household],
    government: &mut Government,
    ubi_rate: f64,
) -> Vec<SimEvent> {
    let n = households.len();
    if n == 0 || ubi_rate <= 0.0 {
        return vec![];
    }

    let needed = ubi_rate * n as f64;
    let austerity = needed > government.cash;
    let per_household = if austerity {
        government.cash / n as f64
    } else {
        ubi_rate
    };

    for h in households.iter_mut() {
        h.cash += per_household;
    }

    if austerity {
        log::warn!(
            "step={step} fiscal: austerity UBI, needed {needed:.2}, reserve {:.2}",
            government.cash
        );
        government.cash = 0.0;
    } else {
        government.cash = (government.cash - needed).max(0.0);
        log::debug!("step={step} fiscal: ubi {per_household:.2} x {n}");
    }

    vec![SimEvent::UbiPaid {
        step,
        per_household,
        total: per_household * n as f64,
        austerity,
    }]
}

/// Mass layoff, then bailout and restructure of a bankrupt firm.
pub fn resolve_bankruptcy(
    step: Step,
    firm: &mut Firm,
    households: &mut [Household],
    government: &mut Government,
    config: &SimConfig,
) -> Vec<SimEvent> {
    let mut events = Vec::new();
    let employees: Vec<_> = firm.employees.iter().copied().collect();

    for &hid in &employees {
        if let Some(h) = households.get_mut(hid) {
            h.lay_off();
        }
        events.push(SimEvent::HouseholdLaidOff {
            step,
            household_id: hid,
            firm_id: firm.id,
            reason: LayoffReason::Bankruptcy,
        });
    }

    let needed = config.min_bailout.max(firm.wage_offer * 10.0 * 6.0);
    let (bailout, funded) = if government.fund(needed) {
        (needed, true)
    } else {
        // Enough to survive at least one buffer period.
        let emergency = config
            .min_bailout
            .max(firm.wage_offer * config.hiring_buffer_months);
        log::warn!(
            "step={step} fiscal: unfunded bailout of {emergency:.2} for firm {}",
            firm.id
        );
        (emergency, false)
    };

    log::info!(
        "step={step} fiscal: firm {} bankrupt (cash {:.2}), {} laid off, bailout {bailout:.2}",
        firm.id,
        firm.cash,
        employees.len()
    );

    firm.restructure(bailout, config);

    events.push(SimEvent::FirmBankrupt {
        step,
        firm_id: firm.id,
        bailout,
        funded,
        employees_laid_off: employees.len(),
    });
    events
}

/// Keep at least `min_solvent_firms` firms with positive cash.
/// Insolvent firms are revived in id order until the floor is met.
pub fn solvency_safety_net(
    step: Step,
    firms: &mut [Firm],
    households: &mut [Household],
    government: &mut Government,
    config: &SimConfig,
) -> Vec<SimEvent> {
    let mut events = Vec::new();

    if solvent_count(firms) >= config.min_solvent_firms {
        return events;
    }

    let insolvent: Vec<FirmId> = firms
        .iter()
        .filter(|f| f.cash <= 0.0)
        .map(|f| f.id)
        .collect();

    for fid in insolvent {
        let firm = &mut firms[fid];
        let grant = config.revival_grant;
        let funded = government.fund(grant);

        // Revived firms start with an empty roster.
        for &hid in &firm.employees {
            if let Some(h) = households.get_mut(hid) {
                h.lay_off();
            }
        }
        firm.restructure(grant, config);

        log::info!("step={step} fiscal: safety net revived firm {fid} (funded={funded})");
        events.push(SimEvent::FirmRevived {
            step,
            firm_id: fid,
            grant,
            funded,
        });

        if solvent_count(firms) >= config.min_solvent_firms {
            break;
        }
    }

    events
}

pub fn solvent_count(firms: &[Firm]) -> usize {
    firms.iter().filter(|f| f.cash > 0.0).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_policy_is_clamped() {
        let p = FiscalPolicy::new(1.5, -0.2, 999.0).clamped();
        assert_eq!(p, FiscalPolicy::new(0.8, 0.0, 200.0));

        let p = FiscalPolicy::new(f64::NAN, 0.3, f64::NAN).clamped();
        assert_eq!(p, FiscalPolicy::new(0.0, 0.3, 0.0));
    }

    #[test]
    fn normalized_action_scales_to_ranges() {
        let p = FiscalPolicy::from_normalized([0.5, 1.0, 0.25]);
        assert!((p.income_tax_rate - 0.4).abs() < 1e-12);
        assert!((p.corp_tax_rate - 0.8).abs() < 1e-12);
        assert!((p.ubi_amount - 50.0).abs() < 1e-12);
    }

    #[test]
    fn income_tax_is_withheld_at_source() {
        let config = SimConfig::default_test();
        let mut govt = Government::new(&config);
        let net = govt.withhold_income_tax(200.0, 0.25);
        assert_eq!(net, 150.0);
        assert_eq!(govt.tax_revenue, 50.0);
        // Remitted tax is tracked, not added to the reserve.
        assert_eq!(govt.cash, 100_000.0);
    }

    #[test]
    fn ubi_paid_in_full_when_affordable() {
        let config = SimConfig::default_test();
        let mut hs: Vec<_> = (0..10).map(|i| Household::new(i, &config)).collect();
        let mut govt = Government::new(&config);
        pay_ubi(1, &mut hs, &mut govt, 50.0);
        assert!(hs.iter().all(|h| h.cash == 550.0));
        assert_eq!(govt.cash, 99_500.0);
    }

    #[test]
    fn ubi_austerity_splits_what_is_left() {
        let config = SimConfig::default_test();
        let mut hs: Vec<_> = (0..10).map(|i| Household::new(i, &config)).collect();
        let mut govt = Government::new(&config);
        govt.cash = 1_000.0;
        let events = pay_ubi(1, &mut hs, &mut govt, 200.0);
        assert_eq!(govt.cash, 0.0);
        assert!(hs.iter().all(|h| h.cash == 600.0));
        assert!(matches!(events[0], SimEvent::UbiPaid { austerity: true, .. }));
    }

    #[test]
    fn funded_bailout_debits_reserve() {
        let config = SimConfig::default_test();
        let mut hs: Vec<_> = (0..2).map(|i| Household::new(i, &config)).collect();
        let mut firm = Firm::new(0, &config);
        firm.cash = -500.0;
        for h in hs.iter_mut() {
            h.hire(0, 100.0, 6);
            firm.employees.insert(h.id);
        }
        let mut govt = Government::new(&config);
        resolve_bankruptcy(1, &mut firm, &mut hs, &mut govt, &config);

        assert_eq!(firm.cash, 20_000.0);
        assert_eq!(govt.cash, 80_000.0);
        assert_eq!(firm.bankruptcies, 1);
        assert!(firm.employees.is_empty());
        assert!(hs.iter().all(|h| !h.is_employed && h.employer.is_none()));
    }

    #[test]
    fn broke_government_issues_unfunded_bailout() {
        let config = SimConfig::default_test();
        let mut firm = Firm::new(0, &config);
        firm.cash = -1.0;
        let mut govt = Government::new(&config);
        govt.cash = 100.0;
        let events = resolve_bankruptcy(1, &mut firm, &mut [], &mut govt, &config);
        assert_eq!(firm.cash, 20_000.0);
        assert_eq!(govt.cash, 100.0);
        assert!(matches!(events[0], SimEvent::FirmBankrupt { funded: false, .. }));
    }

    #[test]
    fn safety_net_stops_at_two_solvent_firms() {
        let config = SimConfig::default_test();
        let mut firms: Vec<_> = (0..4).map(|i| Firm::new(i, &config)).collect();
        for f in &mut firms {
            f.cash = 0.0;
        }
        let mut govt = Government::new(&config);
        let events = solvency_safety_net(1, &mut firms, &mut [], &mut govt, &config);

        assert_eq!(events.len(), 2);
        assert_eq!(firms.iter().filter(|f| f.cash > 0.0).count(), 2);
        assert_eq!(govt.cash, 60_000.0);
    }
}
