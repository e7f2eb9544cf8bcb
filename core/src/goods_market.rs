//! Goods market: households spend against firm inventories.
//!
//! Limited search: each shopper samples a few stocked firms at random
//! and buys from them cheapest-first. Nobody sees the whole market, so
//! the single cheapest firm cannot sell out the economy on its own.

use crate::{
    config::SimConfig,
    event::SimEvent,
    firm::Firm,
    household::Household,
    rng::SimRng,
    types::{FirmId, HouseholdId, Step},
};

/// Subsistence plus half of everything above it, never more than cash.
pub fn household_budget(cash: f64, subsistence_cost: f64) -> f64 {
    cash.min(subsistence_cost + 0.5 * (cash - subsistence_cost))
}

pub fn clear(
    step: Step,
    households: &mut [Household],
    firms: &mut [Firm],
    config: &SimConfig,
    rng: &mut SimRng,
) -> Vec<SimEvent> {
    let mut shoppers: Vec<HouseholdId> = households.iter().map(|h| h.id).collect();
    rng.shuffle(&mut shoppers);

    let mut units_sold = 0.0;
    let mut revenue = 0.0;
    let mut buyers = 0;

    for hid in shoppers {
        let household = &mut households[hid];
        let budget = household_budget(household.cash, config.subsistence_cost);
        if budget <= 0.0 {
            continue;
        }

        let stocked: Vec<FirmId> = firms
            .iter()
            .filter(|f| f.inventory > 0.0)
            .map(|f| f.id)
            .collect();
        if stocked.is_empty() {
            continue;
        }

        let mut considered: Vec<FirmId> = rng
            .sample_indices(stocked.len(), config.shopping_search_size)
            .into_iter()
            .map(|i| stocked[i])
            .collect();
        considered.sort_by(|&a, &b| firms[a].price.total_cmp(&firms[b].price));

        let mut spent = 0.0;
        for fid in considered {
            let firm = &mut firms[fid];
            if firm.inventory <= 0.0 {
                continue;
            }

            let affordable = (budget - spent) / firm.price;
            let units = firm.inventory.min(affordable);
            if units <= 0.0 {
                break; // budget exhausted
            }

            let cost = firm.sell(units);
            household.cash -= cost;
            household.inventory += units;
            spent += cost;
            units_sold += units;
            revenue += cost;
        }

        if spent > 0.0 {
            buyers += 1;
        }
    }

    log::debug!("step={step} goods: units_sold={units_sold:.1} revenue={revenue:.2} buyers={buyers}");

    vec![SimEvent::GoodsMarketCleared {
        step,
        units_sold,
        revenue,
        buyers,
    }]
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
    fn budget_is_subsistence_plus_half_the_surplus() {
        assert_eq!(household_budget(500.0, 100.0), 300.0);
        assert_eq!(household_budget(80.0, 100.0), 80.0);
        assert_eq!(household_budget(0.0, 100.0), 0.0);
    }

    #[test]
    fn shopper_buys_cheapest_first() {
        let (mut hs, mut fs, config) = market(1, 2);
        fs[0].inventory = 100.0;
        fs[0].price = 20.0;
        fs[1].inventory = 100.0;
        fs[1].price = 10.0;
        let mut rng = SimRng::new(11);
        clear(1, &mut hs, &mut fs, &config, &mut rng);

        // Budget 300 all spent at the cheaper firm.
        assert!((fs[1].last_sales - 30.0).abs() < 1e-9);
        assert_eq!(fs[0].last_sales, 0.0);
        assert!((hs[0].cash - 200.0).abs() < 1e-9);
        assert!((hs[0].inventory - 30.0).abs() < 1e-9);
    }

    #[test]
    fn spills_over_when_cheapest_sells_out() {
        let (mut hs, mut fs, config) = market(1, 2);
        fs[0].inventory = 100.0;
        fs[0].price = 20.0;
        fs[1].inventory = 10.0;
        fs[1].price = 10.0;
        let mut rng = SimRng::new(12);
        clear(1, &mut hs, &mut fs, &config, &mut rng);

        assert_eq!(fs[1].inventory, 0.0);
        // 300 − 100 = 200 left → 10 units at 20.
        assert!((fs[0].last_sales - 10.0).abs() < 1e-9);
        assert!((hs[0].cash - 200.0).abs() < 1e-9);
    }

    #[test]
    fn money_and_goods_are_conserved() {
        let (mut hs, mut fs, config) = market(30, 5);
        for f in &mut fs {
            f.inventory = 25.0;
        }
        let cash_before: f64 =
            hs.iter().map(|h| h.cash).sum::<f64>() + fs.iter().map(|f| f.cash).sum::<f64>();
        let mut rng = SimRng::new(13);
        clear(1, &mut hs, &mut fs, &config, &mut rng);
        let cash_after: f64 =
            hs.iter().map(|h| h.cash).sum::<f64>() + fs.iter().map(|f| f.cash).sum::<f64>();
        let goods: f64 =
            hs.iter().map(|h| h.inventory).sum::<f64>() + fs.iter().map(|f| f.inventory).sum::<f64>();

        assert!((cash_before - cash_after).abs() < 1e-6);
        assert!((goods - 125.0).abs() < 1e-6);
        assert!(hs.iter().all(|h| h.cash >= -1e-9));
    }

    #[test]
    fn no_stock_means_no_purchase() {
        let (mut hs, mut fs, config) = market(5, 2);
        let mut rng = SimRng::new(14);
        let events = clear(1, &mut hs, &mut fs, &config, &mut rng);
        assert!(hs.iter().all(|h| h.cash == 500.0));
        assert_eq!(
            events,
            vec![SimEvent::GoodsMarketCleared { step: 1, units_sold: 0.0, revenue: 0.0, buyers: 0 }]
        );
    }
}
