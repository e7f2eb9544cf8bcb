//! Shared primitive types used across the entire simulation.

/// A simulation step. One step = one simulated month.
pub type Step = u64;

/// Index of a household in the World's household arena.
pub type HouseholdId = usize;

/// Index of a firm in the World's firm arena.
pub type FirmId = usize;

/// The canonical run identifier.
pub type RunId = String;
