//! The simulation engine: the shell around one World.
//!
//! The World is the pure economy. The engine adds what a run needs
//! around it: a clock, the event log, per-step stats history, and
//! periodic snapshots. It is the contract external controllers use:
//! `reset`, `step`, `get_market_stats`, and the entity snapshots.
//!
//! RULES:
//!   - Every step's events are persisted in emission order.
//!   - Snapshots are read-only views taken after a completed step.
//!   - One engine owns one World. Parallel runs use separate engines.

use crate::{
    clock::SimClock,
    config::SimConfig,
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    firm::FirmState,
    fiscal::FiscalPolicy,
    household::HouseholdState,
    metrics::MarketStats,
    snapshot::WorldSnapshot,
    store::{SimStore, StatsRecord},
    types::{FirmId, HouseholdId, RunId, Step},
    world::{Phase, World},
};

pub struct SimEngine {
    pub run_id: RunId,
    pub clock:  SimClock,
    pub store:  SimStore,
    world:      World,
}

impl SimEngine {
    /// Build an engine and initialize its World from `config.random_seed`.
    /// Registers the run in the store if it is not there yet.
    pub fn new(run_id: RunId, config: SimConfig, store: SimStore) -> SimResult<Self> {
        config.validate()?;
        let seed = config.random_seed;

        if store.run_seed(&run_id)?.is_none() {
            store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;
        }

        let mut engine = Self {
            clock: SimClock::new(run_id.clone()),
            world: World::new(config, seed),
            store,
            run_id,
        };
        engine.reset(seed)?;
        Ok(engine)
    }

    /// Engine over a migrated in-memory store with default config.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        Self::build_test_with(run_id, seed, SimConfig::default_test())
    }

    pub fn build_test_with(run_id: RunId, seed: u64, config: SimConfig) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        let config = SimConfig { random_seed: seed, ..config };
        Self::new(run_id, config, store)
    }

    /// Rebuild the population with default state and re-seed the stream.
    pub fn reset(&mut self, seed: u64) -> SimResult<MarketStats> {
        self.world = World::new(self.world.config.clone(), seed);
        self.clock.reset();
        self.store.clear_history(&self.run_id)?;

        let init = SimEvent::RunInitialized {
            run_id: self.run_id.clone(),
            seed,
        };
        self.persist_event(0, Phase::Engine, &init)?;

        log::info!(
            "run={} reset: seed={seed} households={} firms={}",
            self.run_id,
            self.world.households.len(),
            self.world.firms.len()
        );
        Ok(self.world.stats.clone())
    }

    /// Advance one month under `policy`. Out-of-range policy values
    /// are clamped, not rejected.
    pub fn step(&mut self, policy: FiscalPolicy) -> SimResult<Vec<SimEvent>> {
        let step = self.clock.advance();

        let tagged = self.world.step(policy);
        debug_assert_eq!(self.world.step, step, "clock and world out of sync");

        let mut events = Vec::with_capacity(tagged.len());
        for (phase, event) in tagged {
            self.persist_event(step, phase, &event)?;
            events.push(event);
        }

        self.store.record_stats(&self.run_id, &self.stats_record())?;

        let interval = self.world.config.snapshot_interval;
        if interval > 0 && step % interval == 0 {
            self.take_snapshot(step)?;
        }

        Ok(events)
    }

    /// Run n steps under a fixed policy. Used for testing and warmup.
    pub fn run_steps(&mut self, n: u64, policy: FiscalPolicy) -> SimResult<()> {
        for _ in 0..n {
            self.step(policy)?;
        }
        Ok(())
    }

    pub fn get_market_stats(&self) -> MarketStats {
        self.world.stats.clone()
    }

    pub fn get_household_state(&self, id: HouseholdId) -> SimResult<HouseholdState> {
        self.world
            .household_state(id)
            .ok_or(SimError::UnknownHousehold { id })
    }

    pub fn get_firm_state(&self, id: FirmId) -> SimResult<FirmState> {
        self.world.firm_state(id).ok_or(SimError::UnknownFirm { id })
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.world.snapshot()
    }

    pub fn govt_cash(&self) -> f64 {
        self.world.government.cash
    }

    pub fn config(&self) -> &SimConfig {
        &self.world.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct World access for scenario setup in tests and tooling.
    /// Production code drives the World only through `step`.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Query events for a specific step from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_step(&self, step: Step) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_step(&self.run_id, step)
    }

    pub fn stats_history(&self) -> SimResult<Vec<StatsRecord>> {
        self.store.stats_history(&self.run_id)
    }

    fn persist_event(&self, step: Step, phase: Phase, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            step,
            phase:      phase.name().to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    fn stats_record(&self) -> StatsRecord {
        let w = &self.world;
        let n_firms = w.firms.len().max(1) as f64;
        let n_households = w.households.len().max(1) as f64;

        StatsRecord {
            step:               w.step,
            stats:              w.stats.clone(),
            govt_cash:          w.government.cash,
            total_bankruptcies: w.firms.iter().map(|f| f.bankruptcies as u64).sum(),
            avg_firm_cash:      w.firms.iter().map(|f| f.cash).sum::<f64>() / n_firms,
            avg_household_cash: w.households.iter().map(|h| h.cash).sum::<f64>() / n_households,
            avg_tier:           w.firms.iter().map(|f| f.tier as f64).sum::<f64>() / n_firms,
        }
    }

    fn take_snapshot(&self, step: Step) -> SimResult<()> {
        let json = serde_json::to_string(&self.world.snapshot())?;
        self.store.save_snapshot(&self.run_id, step, &json)?;
        log::debug!("Snapshot saved at step {step}");
        Ok(())
    }
}
