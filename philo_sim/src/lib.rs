//! Philo Sim - host harness for the dining philosophers simulation.
//!
//! Everything the core deliberately leaves outside lives here: the console
//! printer driving status rounds, the built-in scenarios with their
//! pass/fail properties, and the JSON run-record export.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                   ScenarioRunner                      │
//! │   ┌───────────────────┐     ┌────────────────────┐    │
//! │   │ philo_core        │     │ SimulationManager  │    │
//! │   │ Simulation        │────►│ (status rounds,    │    │
//! │   │ (actors+detector) │ bus │  console printer)  │    │
//! │   └───────────────────┘     └────────────────────┘    │
//! │             │ FinalStats                              │
//! │             ▼                                         │
//! │   scenario assertions ──► ScenarioResult ──► export   │
//! └───────────────────────────────────────────────────────┘
//! ```

mod export;
mod manager;
mod runner;
pub mod scenarios;

pub use export::{RunExport, RunRecord};
pub use manager::{SimulationManager, STEP_INTERVAL};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
