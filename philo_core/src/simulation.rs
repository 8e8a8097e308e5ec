//! Simulation - the explicit supervisor owning the table arena.
//!
//! Builds the ring of forks and philosophers, wires the report buses,
//! spawns a fixed, statically known set of tasks (philosophers, their
//! reporters, the detector and a verdict supervisor) and joins them all at
//! completion. There is no global registry: every component receives its
//! collaborators explicitly.

use crate::channel::{ReportBus, SnapshotItem, SnapshotQuery, StatusQuery, StatusReport};
use crate::config::SimulationConfig;
use crate::coordinator::CompletionCoordinator;
use crate::detector::{DeadlockDetector, DeadlockReport};
use crate::error::SimError;
use crate::fork::Fork;
use crate::philosopher::{Philosopher, PhilosopherProbe};
use crate::shutdown::ShutdownToken;
use crate::stats::{FinalStats, ForkStats, PhilosopherStats, SimulationOutcome};
use crate::strategy::ForkStrategy;
use crate::types::{philosopher_name, ForkId, PhilosopherId};

use philo_env::Clock;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running simulation and the handle to its lifecycle.
///
/// Created with [`Simulation::start`]; the run ends when [`stop`] is
/// called, a host-side driver stops it, or the detector's verdict cancels
/// it. [`await_completion`] then joins every task and returns the stats.
///
/// [`stop`]: Simulation::stop
/// [`await_completion`]: Simulation::await_completion
pub struct Simulation<C: Clock> {
    config: SimulationConfig,
    clock: Arc<C>,
    shutdown: ShutdownToken,
    coordinator: CompletionCoordinator,
    names: Arc<Vec<String>>,
    forks: Vec<Arc<Fork<C>>>,
    probes: Vec<PhilosopherProbe<C>>,
    status_bus: Option<ReportBus<StatusQuery, StatusReport>>,
    verdict: Arc<Mutex<Option<DeadlockReport>>>,
    tasks: Vec<JoinHandle<()>>,
    started_at: Duration,
}

impl<C: Clock> std::fmt::Debug for Simulation<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl<C: Clock> Simulation<C> {
    /// Validates the configuration, builds the table and spawns every
    /// actor. Must be called from within a tokio runtime.
    ///
    /// Philosopher *i* gets `right = fork[i]`, `left = fork[(i+1) % N]`;
    /// each fork is shared by exactly two neighbors. In asymmetric mode
    /// seat 0 is the single left-handed philosopher.
    pub fn start(
        count: usize,
        config: SimulationConfig,
        clock: Arc<C>,
    ) -> Result<Simulation<C>, SimError> {
        config.validate()?;
        if count < 2 {
            return Err(SimError::config(format!(
                "at least 2 philosophers required, got {count}"
            )));
        }

        info!(count, mode = %config.mode, seed = config.seed, "starting simulation");

        let shutdown = ShutdownToken::new();
        let coordinator = CompletionCoordinator::new();
        let names: Arc<Vec<String>> = Arc::new((0..count).map(philosopher_name).collect());
        let forks: Vec<Arc<Fork<C>>> = (0..count)
            .map(|index| Arc::new(Fork::new(ForkId(index), clock.clone())))
            .collect();

        let mut snapshot_bus: ReportBus<SnapshotQuery, SnapshotItem> = ReportBus::new(count);
        let mut status_bus: ReportBus<StatusQuery, StatusReport> = ReportBus::new(count);

        let mut tasks = Vec::with_capacity(count * 2 + 2);
        let mut probes = Vec::with_capacity(count);

        for index in 0..count {
            let id = PhilosopherId(index);
            let left = forks[(index + 1) % count].clone();
            let right = forks[index].clone();
            let left_handed = config.mode.is_left_handed(index);
            if left_handed {
                debug!(philosopher = %names[index], "seated left-handed");
            }

            let strategy = ForkStrategy::new(id, left.clone(), right.clone(), left_handed);
            let philosopher = Philosopher::new(
                id,
                names[index].clone(),
                strategy,
                config.clone(),
                clock.clone(),
                shutdown.clone(),
            );
            let probe = philosopher.probe(left, right, names.clone());

            let snapshot_publisher = snapshot_bus.register();
            let status_publisher = status_bus.register();
            tasks.push(tokio::spawn(
                probe.clone().serve(snapshot_publisher, status_publisher),
            ));

            let guard = coordinator.register(philosopher.name());
            tasks.push(tokio::spawn(async move {
                philosopher.run().await;
                drop(guard);
            }));
            probes.push(probe);
        }

        let (verdict_tx, verdict_rx) = oneshot::channel();
        let detector =
            DeadlockDetector::new(snapshot_bus, clock.clone(), shutdown.clone(), verdict_tx);
        let detector_guard = coordinator.register("deadlock-detector");
        tasks.push(tokio::spawn(async move {
            detector.run().await;
            drop(detector_guard);
        }));

        // Verdict supervisor: the detector only raises the condition; this
        // task is what actually cancels the run.
        let verdict: Arc<Mutex<Option<DeadlockReport>>> = Arc::new(Mutex::new(None));
        {
            let verdict = Arc::clone(&verdict);
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                tokio::select! {
                    report = verdict_rx => {
                        if let Ok(report) = report {
                            warn!(round = report.round, "deadlock verdict received, cancelling simulation");
                            *verdict.lock().unwrap() = Some(report);
                            shutdown.cancel();
                        }
                    }
                    _ = shutdown.cancelled() => {}
                }
            }));
        }

        let started_at = clock.now();
        Ok(Simulation {
            config,
            clock,
            shutdown,
            coordinator,
            names,
            forks,
            probes,
            status_bus: Some(status_bus),
            verdict,
            tasks,
            started_at,
        })
    }

    /// Requests shutdown of every actor. Idempotent.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// The status report bus, for the host's printer/driver. Can be taken
    /// once; a simulation without a status consumer runs fine without it.
    pub fn status_bus(&mut self) -> Option<ReportBus<StatusQuery, StatusReport>> {
        self.status_bus.take()
    }

    pub fn coordinator(&self) -> CompletionCoordinator {
        self.coordinator.clone()
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<C> {
        Arc::clone(&self.clock)
    }

    /// Table roster, by seat index.
    pub fn names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.names)
    }

    /// Simulation time elapsed since start.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.started_at)
    }

    /// Waits until every registered actor has completed, joins all tasks
    /// and assembles the final statistics.
    ///
    /// Something must end the run first: [`Simulation::stop`], a host
    /// driver, or the detector's verdict.
    pub async fn await_completion(mut self) -> Result<FinalStats, SimError> {
        self.coordinator.wait_idle().await;

        // Release the status fan-out if no host consumer claimed it, so
        // the reporters observe the bus closing and finish.
        self.status_bus.take();

        for task in self.tasks.drain(..) {
            task.await.map_err(|err| SimError::Join(err.to_string()))?;
        }

        let elapsed = self.elapsed();
        let philosophers: Vec<PhilosopherStats> =
            self.probes.iter().map(|probe| probe.stats()).collect();
        let forks: Vec<ForkStats> = self
            .forks
            .iter()
            .map(|fork| {
                let usage = fork.usage();
                ForkStats {
                    id: fork.id(),
                    used_ms: usage.used.as_millis() as u64,
                    available_ms: usage.available.as_millis() as u64,
                    blocked_ms: usage.blocked.as_millis() as u64,
                    contention: usage.contention,
                }
            })
            .collect();

        let faulted = self.probes.iter().any(|probe| probe.fault().is_some());
        let outcome = match self.verdict.lock().unwrap().take() {
            Some(report) => SimulationOutcome::Deadlock(report),
            None if faulted => SimulationOutcome::Faulted,
            None => SimulationOutcome::Completed,
        };

        let stats = FinalStats {
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
            philosophers,
            forks,
        };
        info!(
            elapsed_ms = stats.elapsed_ms,
            meals = stats.total_meals(),
            deadlock = stats.is_deadlock(),
            "simulation finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeRange;
    use crate::strategy::ArbitrationMode;
    use philo_env::TokioClock;

    fn liveness_config() -> SimulationConfig {
        SimulationConfig {
            thinking: TimeRange::new(30, 100),
            eating: TimeRange::new(40, 50),
            take_fork: TimeRange::fixed(20),
            steps: 10,
            mode: ArbitrationMode::Asymmetric,
            seed: 42,
        }
    }

    #[tokio::test]
    async fn test_start_rejects_small_table() {
        let clock = TokioClock::shared();
        let err = Simulation::start(1, liveness_config(), clock).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let clock = TokioClock::shared();
        let config = SimulationConfig {
            thinking: TimeRange::new(100, 30),
            ..liveness_config()
        };
        assert!(Simulation::start(5, config, clock).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_under_asymmetric_strategy() {
        let clock = TokioClock::shared();
        let sim = Simulation::start(5, liveness_config(), clock).unwrap();

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        sim.stop();
        let stats = sim.await_completion().await.unwrap();

        assert!(
            matches!(stats.outcome, SimulationOutcome::Completed),
            "no deadlock expected under the asymmetric strategy"
        );
        for philosopher in &stats.philosophers {
            assert!(
                philosopher.meals_eaten >= 1,
                "{} starved: {:?}",
                philosopher.name,
                stats.philosophers
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadlock_under_symmetric_strategy() {
        let clock = TokioClock::shared();
        let config = SimulationConfig {
            thinking: TimeRange::new(1, 5),
            eating: TimeRange::new(40, 50),
            take_fork: TimeRange::new(40, 45),
            mode: ArbitrationMode::Symmetric,
            seed: 7,
            ..liveness_config()
        };
        let sim = Simulation::start(5, config, clock).unwrap();

        // No one stops the run; the verdict must end it by itself.
        let stats = tokio::time::timeout(Duration::from_secs(600), sim.await_completion())
            .await
            .expect("detector should end the run")
            .unwrap();

        match stats.outcome {
            SimulationOutcome::Deadlock(report) => {
                assert_eq!(report.snapshot.len(), 5);
                assert!(crate::detector::is_deadlock(&report.snapshot));
            }
            other => panic!("expected deadlock, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forks_are_free_after_shutdown() {
        let clock = TokioClock::shared();
        let sim = Simulation::start(3, liveness_config(), clock).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        sim.stop();

        // Keep handles to the forks across completion.
        let forks = sim.forks.clone();
        let stats = sim.await_completion().await.unwrap();

        for fork in &forks {
            assert_eq!(fork.holder(), None, "{} leaked", fork.id());
        }
        assert!(stats.elapsed_ms >= 500);
    }
}
