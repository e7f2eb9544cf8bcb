//! The event log: every observable state change in a step.
//!
//! RULE: Phases report what they did ONLY through events.
//! The engine persists them; tests and tooling read them back.

use crate::types::{FirmId, HouseholdId, RunId, Step};
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    StepStarted {
        step: Step,
    },
    StepCompleted {
        step: Step,
    },
    PolicyApplied {
        step: Step,
        income_tax_rate: f64,
        corp_tax_rate: f64,
        ubi_amount: f64,
    },

    // ── Production ─────────────────────────────────
    ProductionCompleted {
        step: Step,
        units_produced: f64,
        wages_paid: f64,
        income_tax_withheld: f64,
    },

    // ── Labor market ───────────────────────────────
    HouseholdHired {
        step: Step,
        household_id: HouseholdId,
        firm_id: FirmId,
        wage: f64,
        previous_employer: Option<FirmId>,
    },
    HouseholdLaidOff {
        step: Step,
        household_id: HouseholdId,
        firm_id: FirmId,
        reason: LayoffReason,
    },
    ContractRenewed {
        step: Step,
        household_id: HouseholdId,
        firm_id: FirmId,
    },
    FirmFailedToHire {
        step: Step,
        firm_id: FirmId,
    },

    // ── Goods market ───────────────────────────────
    GoodsMarketCleared {
        step: Step,
        units_sold: f64,
        revenue: f64,
        buyers: usize,
    },

    // ── Fiscal ─────────────────────────────────────
    UbiPaid {
        step: Step,
        per_household: f64,
        total: f64,
        austerity: bool,
    },
    FirmBankrupt {
        step: Step,
        firm_id: FirmId,
        bailout: f64,
        funded: bool,
        employees_laid_off: usize,
    },
    FirmRevived {
        step: Step,
        firm_id: FirmId,
        grant: f64,
        funded: bool,
    },

    // ── Firm growth ────────────────────────────────
    FirmUpgraded {
        step: Step,
        firm_id: FirmId,
        tier: u8,
        cost: f64,
    },

    // ── Metrics ────────────────────────────────────
    StatsComputed {
        step: Step,
        unemployment: f64,
        avg_price: f64,
        avg_wage: f64,
        gdp: f64,
        gini: f64,
        subsistence_failures: usize,
    },
}

impl SimEvent {
    /// Stable string name for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }      => "run_initialized",
            Self::StepStarted { .. }         => "step_started",
            Self::StepCompleted { .. }       => "step_completed",
            Self::PolicyApplied { .. }       => "policy_applied",
            Self::ProductionCompleted { .. } => "production_completed",
            Self::HouseholdHired { .. }      => "household_hired",
            Self::HouseholdLaidOff { .. }    => "household_laid_off",
            Self::ContractRenewed { .. }     => "contract_renewed",
            Self::FirmFailedToHire { .. }    => "firm_failed_to_hire",
            Self::GoodsMarketCleared { .. }  => "goods_market_cleared",
            Self::UbiPaid { .. }             => "ubi_paid",
            Self::FirmBankrupt { .. }        => "firm_bankrupt",
            Self::FirmRevived { .. }         => "firm_revived",
            Self::FirmUpgraded { .. }        => "firm_upgraded",
            Self::StatsComputed { .. }       => "stats_computed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayoffReason {
    /// Contract expired at an employer with a full roster.
    OverCapacity,
    /// Employer went bankrupt; all contracts voided.
    Bankruptcy,
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub step: Step,
    pub phase: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}
