//! SQLite persistence layer for a single run's audit trail.
//!
//! RULE: Only store.rs talks to the database.
//! The World never reads back from the store; it is write-mostly
//! history for tooling, tests, and end-of-run reports.

use crate::{
    error::SimResult,
    event::EventLogEntry,
    metrics::MarketStats,
    types::Step,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// One row of per-step history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsRecord {
    pub step:               Step,
    pub stats:              MarketStats,
    pub govt_cash:          f64,
    pub total_bankruptcies: u64,
    pub avg_firm_cash:      f64,
    pub avg_household_cash: f64,
    pub avg_tier:           f64,
}

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the run database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        let started_at = chrono::Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, started_at],
        )?;
        Ok(())
    }

    pub fn run_seed(&self, run_id: &str) -> SimResult<Option<u64>> {
        let seed = self
            .conn
            .query_row(
                "SELECT seed FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(seed.map(|s| s as u64))
    }

    /// Drop a run's history (on reset). The run row itself stays.
    pub fn clear_history(&self, run_id: &str) -> SimResult<()> {
        for table in ["event_log", "snapshot", "market_stats"] {
            self.conn.execute(
                &format!("DELETE FROM {table} WHERE run_id = ?1"),
                params![run_id],
            )?;
        }
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, step, phase, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.step as i64,
                entry.phase,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_step(&self, run_id: &str, step: Step) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, step, phase, event_type, payload
             FROM event_log WHERE run_id = ?1 AND step = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, step as i64], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    step:       row.get::<_, i64>(2)? as u64,
                    phase:      row.get(3)?,
                    event_type: row.get(4)?,
                    payload:    row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count_by_type(&self, run_id: &str, event_type: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, run_id: &str, step: Step, state_json: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshot (run_id, step, state_json) VALUES (?1, ?2, ?3)",
            params![run_id, step as i64, state_json],
        )?;
        Ok(())
    }

    pub fn latest_snapshot_before(
        &self,
        run_id: &str,
        step: Step,
    ) -> SimResult<Option<(Step, String)>> {
        let result = self
            .conn
            .query_row(
                "SELECT step, state_json FROM snapshot
                 WHERE run_id = ?1 AND step <= ?2
                 ORDER BY step DESC LIMIT 1",
                params![run_id, step as i64],
                |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(result)
    }

    // ── Market stats ───────────────────────────────────────────

    pub fn record_stats(&self, run_id: &str, record: &StatsRecord) -> SimResult<()> {
        let s = &record.stats;
        self.conn.execute(
            "INSERT OR REPLACE INTO market_stats (
                run_id, step, unemployment, avg_price, avg_wage, tax_revenue, gdp, gini,
                subsistence_failures, govt_cash, total_bankruptcies,
                avg_firm_cash, avg_household_cash, avg_tier
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                run_id,
                record.step as i64,
                s.unemployment,
                s.avg_price,
                s.avg_wage,
                s.tax_revenue,
                s.gdp,
                s.gini,
                s.subsistence_failures as i64,
                record.govt_cash,
                record.total_bankruptcies as i64,
                record.avg_firm_cash,
                record.avg_household_cash,
                record.avg_tier,
            ],
        )?;
        Ok(())
    }

    pub fn stats_history(&self, run_id: &str) -> SimResult<Vec<StatsRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT step, unemployment, avg_price, avg_wage, tax_revenue, gdp, gini,
                    subsistence_failures, govt_cash, total_bankruptcies,
                    avg_firm_cash, avg_household_cash, avg_tier
             FROM market_stats WHERE run_id = ?1
             ORDER BY step ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(StatsRecord {
                    step: row.get::<_, i64>(0)? as u64,
                    stats: MarketStats {
                        unemployment:         row.get(1)?,
                        avg_price:            row.get(2)?,
                        avg_wage:             row.get(3)?,
                        tax_revenue:          row.get(4)?,
                        gdp:                  row.get(5)?,
                        gini:                 row.get(6)?,
                        subsistence_failures: row.get::<_, i64>(7)? as usize,
                    },
                    govt_cash:          row.get(8)?,
                    total_bankruptcies: row.get::<_, i64>(9)? as u64,
                    avg_firm_cash:      row.get(10)?,
                    avg_household_cash: row.get(11)?,
                    avg_tier:           row.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
