//! Final run statistics assembled when a simulation completes.

use crate::detector::DeadlockReport;
use crate::types::{ForkId, PhilosopherId};
use serde::Serialize;

/// Per-philosopher totals.
#[derive(Debug, Clone, Serialize)]
pub struct PhilosopherStats {
    pub id: PhilosopherId,
    pub name: String,
    pub meals_eaten: u64,
    pub hungry_time_ms: u64,
}

/// Per-fork cumulative usage.
#[derive(Debug, Clone, Serialize)]
pub struct ForkStats {
    pub id: ForkId,
    pub used_ms: u64,
    pub available_ms: u64,
    pub blocked_ms: u64,
    pub contention: u64,
}

/// How the run ended.
#[derive(Debug, Clone, Serialize)]
pub enum SimulationOutcome {
    /// Stopped normally (step limit reached or host-initiated stop)
    Completed,
    /// The detector reached a positive verdict
    Deadlock(DeadlockReport),
    /// At least one philosopher aborted on a resource violation
    Faulted,
}

/// Everything a host learns from a finished simulation.
#[derive(Debug, Clone, Serialize)]
pub struct FinalStats {
    pub outcome: SimulationOutcome,
    pub elapsed_ms: u64,
    pub philosophers: Vec<PhilosopherStats>,
    pub forks: Vec<ForkStats>,
}

impl FinalStats {
    /// Whether the run ended in a detected deadlock.
    pub fn is_deadlock(&self) -> bool {
        matches!(self.outcome, SimulationOutcome::Deadlock(_))
    }

    /// Total meals eaten across the table.
    pub fn total_meals(&self) -> u64 {
        self.philosophers.iter().map(|p| p.meals_eaten).sum()
    }
}
