//! Simulation configuration.

use crate::error::SimError;
use crate::strategy::ArbitrationMode;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An inclusive `[min, max]` range of milliseconds for a randomized timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Lower bound in milliseconds
    pub min: u64,
    /// Upper bound in milliseconds
    pub max: u64,
}

impl TimeRange {
    /// Creates a range.
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Creates a degenerate range that always samples the same value.
    pub const fn fixed(value: u64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Samples a duration from the range.
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        Duration::from_millis(rng.gen_range(self.min..=self.max))
    }

    fn validate(&self, what: &str) -> Result<(), SimError> {
        if self.min > self.max {
            return Err(SimError::config(format!(
                "{what}: min ({}) exceeds max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Configuration value object consumed by the simulation core.
///
/// Produced externally (CLI, config file); the core only validates and
/// reads it. All times are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// How long a philosopher thinks, randomized per state entry
    pub thinking: TimeRange,
    /// How long a philosopher eats, randomized per state entry
    pub eating: TimeRange,
    /// Fork pickup delay and acquisition backoff, randomized per state entry
    pub take_fork: TimeRange,
    /// Number of status-reporting rounds before the host stops the run
    pub steps: u32,
    /// Fork acquisition ordering policy
    pub mode: ArbitrationMode,
    /// Master seed; every philosopher derives its own timer RNG from it
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            thinking: TimeRange::new(300, 800),
            eating: TimeRange::new(200, 500),
            take_fork: TimeRange::new(50, 100),
            steps: 30,
            mode: ArbitrationMode::Asymmetric,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Validates the configuration.
    ///
    /// Fatal at startup: an invalid configuration means the simulation is
    /// never constructed.
    pub fn validate(&self) -> Result<(), SimError> {
        self.thinking.validate("thinking time")?;
        self.eating.validate("eating time")?;
        self.take_fork.validate("take-fork time")?;
        if self.steps == 0 {
            return Err(SimError::config("steps must be at least 1"));
        }
        Ok(())
    }
}
