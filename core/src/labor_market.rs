//! Labor market: one matching pass per step.
//!
//! Seekers (unemployed, or contract expired) and hiring-eligible firms
//! are both shuffled. Each seeker takes the FIRST firm in shuffled order
//! whose offer meets their baseline. First-fit bounds search cost and
//! keeps a single high payer from absorbing the whole labor pool.
//!
//! The committed-budget ledger lives only for this pass. It stops one
//! firm's cash from being promised to more hires than it can carry.

use crate::{
    config::SimConfig,
    event::{LayoffReason, SimEvent},
    firm::Firm,
    household::Household,
    rng::SimRng,
    types::{FirmId, HouseholdId, Step},
};
use std::collections::BTreeSet;

pub fn clear(
    step: Step,
    households: &mut [Household],
    firms: &mut [Firm],
    config: &SimConfig,
    rng: &mut SimRng,
) -> Vec<SimEvent> {
    let mut events = Vec::new();

    let mut seekers: Vec<HouseholdId> = households
        .iter()
        .filter(|h| h.is_job_seeker())
        .map(|h| h.id)
        .collect();
    rng.shuffle(&mut seekers);

    let mut hiring: Vec<FirmId> = firms
        .iter()
        .filter(|f| f.can_afford_hire(config))
        .map(|f| f.id)
        .collect();
    rng.shuffle(&mut hiring);

    // Indexed by firm id; only hiring firms ever accrue commitments.
    let mut committed_budget = vec![0.0_f64; firms.len()];
    let mut firms_who_hired: BTreeSet<FirmId> = BTreeSet::new();

    for &hid in &seekers {
        let household = &mut households[hid];
        let baseline = if household.is_employed {
            household.wage
        } else {
            household.reservation_wage
        };

        let chosen = hiring.iter().copied().find(|&fid| {
            let firm = &firms[fid];
            if firm.at_capacity() {
                return false;
            }
            if firm.cash - committed_budget[fid] < firm.hiring_cost(config) {
                return false; // tapped out
            }
            firm.wage_offer >= baseline
        });

        match chosen {
            Some(fid) => {
                let previous_employer = household.employer.filter(|_| household.is_employed);
                if let Some(old) = previous_employer {
                    firms[old].employees.remove(&hid);
                }

                let offer = firms[fid].wage_offer;
                household.hire(fid, offer, config.contract_months);
                firms[fid].employees.insert(hid);
                committed_budget[fid] += firms[fid].hiring_cost(config);
                firms_who_hired.insert(fid);

                events.push(SimEvent::HouseholdHired {
                    step,
                    household_id: hid,
                    firm_id: fid,
                    wage: offer,
                    previous_employer,
                });
            }
            None => {
                let Some(old) = household.employer.filter(|_| household.is_employed) else {
                    continue;
                };
                let employer = &mut firms[old];
                if employer.employees.len() >= employer.max_employees {
                    employer.employees.remove(&hid);
                    household.lay_off();
                    events.push(SimEvent::HouseholdLaidOff {
                        step,
                        household_id: hid,
                        firm_id: old,
                        reason: LayoffReason::OverCapacity,
                    });
                } else {
                    household.contract_remaining = config.contract_months;
                    events.push(SimEvent::ContractRenewed {
                        step,
                        household_id: hid,
                        firm_id: old,
                    });
                }
            }
        }
    }

    for &fid in &hiring {
        if !firms_who_hired.contains(&fid) {
            firms[fid].failed_to_hire = true;
            events.push(SimEvent::FirmFailedToHire { step, firm_id: fid });
        }
    }

    log::debug!(
        "step={step} labor: seekers={} hiring_firms={} hires={}",
        seekers.len(),
        hiring.len(),
        events
            .iter()
            .filter(|e| matches!(e, SimEvent::HouseholdHired { .. }))
            .count()
    );

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(n_households: usize, n_firms: usize) -> (Vec<Household>, Vec<Firm>, SimConfig) {
        let config = SimConfig::default_test();
        let households = (0..n_households).map(|i| Household::new(i, &config)).collect();
        let firms = (0..n_firms).map(|i| Firm::new(i, &config)).collect();
        (households, firms, config)
    }

    #[test]
    fn new_hires_get_full_contract_and_roster_entry() {
        let (mut hs, mut fs, config) = market(3, 1);
        let mut rng = SimRng::new(1);
        clear(1, &mut hs, &mut fs, &config, &mut rng);

        for h in &hs {
            assert!(h.is_employed);
            assert_eq!(h.employer, Some(0));
            assert_eq!(h.contract_remaining, 6);
            assert!(fs[0].employees.contains(&h.id));
        }
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let (mut hs, mut fs, config) = market(20, 1);
        let mut rng = SimRng::new(2);
        clear(1, &mut hs, &mut fs, &config, &mut rng);
        assert_eq!(fs[0].employees.len(), 5);
        assert_eq!(hs.iter().filter(|h| h.is_employed).count(), 5);
    }

    #[test]
    fn committed_budget_limits_hires() {
        let (mut hs, mut fs, config) = market(5, 1);
        // Enough buffer for exactly two hires at 100 × 3.
        fs[0].cash = 650.0;
        let mut rng = SimRng::new(3);
        clear(1, &mut hs, &mut fs, &config, &mut rng);
        assert_eq!(fs[0].employees.len(), 2);
    }

    #[test]
    fn offer_below_reservation_wage_is_refused_and_flagged() {
        let (mut hs, mut fs, config) = market(2, 1);
        for h in &mut hs {
            h.reservation_wage = 500.0;
        }
        let mut rng = SimRng::new(4);
        let events = clear(1, &mut hs, &mut fs, &config, &mut rng);
        assert!(fs[0].employees.is_empty());
        assert!(fs[0].failed_to_hire);
        assert!(events.contains(&SimEvent::FirmFailedToHire { step: 1, firm_id: 0 }));
    }

    #[test]
    fn poor_firms_are_not_eligible() {
        let (mut hs, mut fs, config) = market(2, 1);
        fs[0].cash = 200.0;
        let mut rng = SimRng::new(5);
        clear(1, &mut hs, &mut fs, &config, &mut rng);
        assert!(fs[0].employees.is_empty());
        // Not eligible at all, so not flagged either.
        assert!(!fs[0].failed_to_hire);
    }

    #[test]
    fn expired_contract_renews_when_nothing_better() {
        let (mut hs, mut fs, config) = market(1, 1);
        hs[0].hire(0, 150.0, 0);
        fs[0].employees.insert(0);
        // Offer below the current wage: no switch.
        fs[0].wage_offer = 100.0;
        let mut rng = SimRng::new(6);
        clear(1, &mut hs, &mut fs, &config, &mut rng);
        assert!(hs[0].is_employed);
        assert_eq!(hs[0].contract_remaining, 6);
        assert_eq!(hs[0].wage, 150.0);
    }

    #[test]
    fn switching_employer_moves_roster_entry() {
        let (mut hs, mut fs, config) = market(1, 2);
        hs[0].hire(0, 100.0, 0);
        fs[0].employees.insert(0);
        fs[0].cash = 0.0; // old employer cannot hire
        fs[1].wage_offer = 130.0;
        let mut rng = SimRng::new(7);
        let events = clear(1, &mut hs, &mut fs, &config, &mut rng);

        assert_eq!(hs[0].employer, Some(1));
        assert!(fs[0].employees.is_empty());
        assert!(fs[1].employees.contains(&0));
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::HouseholdHired { previous_employer: Some(0), firm_id: 1, .. }
        )));
    }

    #[test]
    fn full_employer_lays_off_on_expiry() {
        let (mut hs, mut fs, config) = market(5, 1);
        for h in hs.iter_mut() {
            h.hire(0, 150.0, 3);
            fs[0].employees.insert(h.id);
        }
        // Full tier-1 firm (5 of 5); one contract runs out.
        hs[4].contract_remaining = 0;
        fs[0].wage_offer = 100.0;
        let mut rng = SimRng::new(8);
        let events = clear(1, &mut hs, &mut fs, &config, &mut rng);

        assert!(!hs[4].is_employed);
        assert_eq!(hs[4].employer, None);
        assert_eq!(fs[0].employees.len(), 4);
        assert!(hs[..4].iter().all(|h| h.is_employed && h.contract_remaining == 3));
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::HouseholdLaidOff { household_id: 4, firm_id: 0, reason: LayoffReason::OverCapacity, .. }
        )));
    }
}
