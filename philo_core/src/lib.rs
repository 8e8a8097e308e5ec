//! Philo Core - Dining Philosophers Simulation Engine
//!
//! This library implements the three moving parts of the simulation:
//! 1. **Resource arbitration**: forks with a lock-then-take reservation
//!    protocol and an asymmetric acquisition order that breaks the cyclic
//!    wait
//! 2. **Actor state machines**: one independently scheduled task per
//!    philosopher, cycling thinking → hungry → taking forks → eating
//! 3. **Deadlock detection**: a fan-out/fan-in snapshot protocol reaching
//!    a whole-table verdict without any global lock
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Simulation                            │
//! │  ┌────────────┐   forks    ┌────────────┐                    │
//! │  │Philosopher │◄──────────►│Philosopher │      ...           │
//! │  │  #0 task   │  (mutex)   │  #1 task   │                    │
//! │  └─────┬──────┘            └─────┬──────┘                    │
//! │        │ snapshot / status items │                           │
//! │  ┌─────▼────────────────────────▼──────┐   ┌──────────────┐  │
//! │  │     bounded report channels         │──►│   Deadlock   │  │
//! │  │  (register / collect per round)     │   │   Detector   │  │
//! │  └─────────────────────────────────────┘   └──────┬───────┘  │
//! │                                            verdict│          │
//! │  ┌─────────────────────────────────────────────────▼──────┐  │
//! │  │  CompletionCoordinator + ShutdownToken (supervisor)    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod fork;
pub mod philosopher;
pub mod shutdown;
pub mod simulation;
pub mod stats;
pub mod strategy;
pub mod types;

// Re-export key types for convenience
pub use channel::{ReportBus, ReportPublisher, RoundOutcome, SnapshotItem, SnapshotQuery, StatusQuery, StatusReport};
pub use config::{SimulationConfig, TimeRange};
pub use coordinator::{CompletionCoordinator, CompletionGuard};
pub use detector::{is_deadlock, DeadlockDetector, DeadlockReport};
pub use error::SimError;
pub use fork::{Fork, ForkStatus, ForkUsage};
pub use philosopher::{Philosopher, PhilosopherProbe, PhilosopherState};
pub use shutdown::ShutdownToken;
pub use simulation::Simulation;
pub use stats::{FinalStats, ForkStats, PhilosopherStats, SimulationOutcome};
pub use strategy::{ArbitrationMode, ForkStrategy};
pub use types::{philosopher_name, ForkId, PhilosopherId};
