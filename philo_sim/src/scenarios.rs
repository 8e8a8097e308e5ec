//! Built-in simulation scenarios.

use philo_core::{ArbitrationMode, SimulationConfig, TimeRange};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Asymmetric table: every philosopher keeps eating, no deadlock
    Liveness,

    /// Symmetric table with tight fork timing: reproduces the classical
    /// deadlock so the detector has something to find
    DeadlockDemo,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![ScenarioId::Liveness, ScenarioId::DeadlockDemo]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Liveness => "liveness",
            ScenarioId::DeadlockDemo => "deadlock_demo",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Liveness => {
                "one left-handed philosopher breaks the cycle; everyone must eat"
            }
            ScenarioId::DeadlockDemo => {
                "all philosophers grab the same side first; the detector must fire"
            }
        }
    }

    /// Simulation configuration for this scenario.
    pub fn config(&self, seed: u64) -> SimulationConfig {
        match self {
            ScenarioId::Liveness => SimulationConfig {
                thinking: TimeRange::new(30, 100),
                eating: TimeRange::new(40, 50),
                take_fork: TimeRange::fixed(20),
                steps: 10,
                mode: ArbitrationMode::Asymmetric,
                seed,
            },
            ScenarioId::DeadlockDemo => SimulationConfig {
                thinking: TimeRange::new(1, 5),
                eating: TimeRange::new(40, 50),
                take_fork: TimeRange::new(40, 45),
                steps: 30,
                mode: ArbitrationMode::Symmetric,
                seed,
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "liveness" => Ok(ScenarioId::Liveness),
            "deadlock_demo" | "deadlockdemo" | "deadlock" => Ok(ScenarioId::DeadlockDemo),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_parsing() {
        assert_eq!("liveness".parse::<ScenarioId>().unwrap(), ScenarioId::Liveness);
        assert_eq!(
            "deadlock".parse::<ScenarioId>().unwrap(),
            ScenarioId::DeadlockDemo
        );
        assert!("nonsense".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_scenario_configs_are_valid() {
        for scenario in ScenarioId::all() {
            scenario.config(42).validate().unwrap();
        }
    }

    #[test]
    fn test_scenario_modes() {
        assert_eq!(
            ScenarioId::Liveness.config(1).mode,
            ArbitrationMode::Asymmetric
        );
        assert_eq!(
            ScenarioId::DeadlockDemo.config(1).mode,
            ArbitrationMode::Symmetric
        );
    }
}
