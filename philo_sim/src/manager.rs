//! SimulationManager - the host-side round driver and console printer.
//!
//! Consumes the simulation's status bus: every step it fans a status
//! request out to the table, prints the collected blocks, and after the
//! configured number of steps requests the final score lines and stops the
//! run. A deadlock verdict cancelling the run mid-step still gets a final
//! score round, since the reporters outlive their state machines.

use philo_core::{
    CompletionCoordinator, ReportBus, RoundOutcome, ShutdownToken, Simulation, StatusQuery,
    StatusReport,
};

use philo_env::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause between status rounds; one step is one simulated second.
pub const STEP_INTERVAL: Duration = Duration::from_millis(1000);

/// Drives `steps` status rounds, then ends the simulation.
pub struct SimulationManager<C: Clock> {
    bus: ReportBus<StatusQuery, StatusReport>,
    steps: u32,
    clock: Arc<C>,
    shutdown: ShutdownToken,
    coordinator: CompletionCoordinator,
    quiet: bool,
}

impl<C: Clock> SimulationManager<C> {
    /// Claims the simulation's status bus. Returns `None` if another
    /// consumer already took it.
    pub fn new(sim: &mut Simulation<C>, quiet: bool) -> Option<Self> {
        let bus = sim.status_bus()?;
        Some(Self {
            bus,
            steps: sim.config().steps,
            clock: sim.clock(),
            shutdown: sim.shutdown_token(),
            coordinator: sim.coordinator(),
            quiet,
        })
    }

    pub async fn run(mut self) {
        let _guard = self.coordinator.register("simulation-manager");
        let started = self.clock.now();
        info!(steps = self.steps, "simulation manager started");

        let mut step: u32 = 0;
        while step < self.steps && !self.shutdown.is_cancelled() {
            step += 1;
            match self
                .bus
                .collect(StatusQuery::Current, &*self.clock, STEP_INTERVAL, &self.shutdown)
                .await
            {
                RoundOutcome::Items(reports) => self.print_step(step, reports),
                RoundOutcome::TimedOut { received, expected } => {
                    warn!(step, received, expected, "status round timed out");
                }
                RoundOutcome::Cancelled => break,
                RoundOutcome::Idle => break,
            }
            tokio::select! {
                _ = self.clock.sleep(STEP_INTERVAL) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }

        // Final scores run on the normal path and after cancellation
        // alike, so the round gets its own deadline-only token.
        let elapsed = self.clock.now().saturating_sub(started);
        let final_round = ShutdownToken::new();
        match self
            .bus
            .collect(
                StatusQuery::Scores { elapsed },
                &*self.clock,
                STEP_INTERVAL,
                &final_round,
            )
            .await
        {
            RoundOutcome::Items(reports) => self.print_scores(elapsed, reports),
            outcome => debug!(outcome = outcome_kind(&outcome), "final score round skipped"),
        }

        self.shutdown.cancel();
        info!(step, "simulation manager finished");
    }

    fn print_step(&self, step: u32, mut reports: Vec<StatusReport>) {
        if self.quiet {
            return;
        }
        reports.sort_by_key(|report| report.philosopher);
        println!("============== STEP {step} ==============");
        for report in &reports {
            println!("{}", report.philosopher_line);
            println!(" |- Left Fork: {}", report.left_fork_line);
            println!(" |- Right Fork: {}", report.right_fork_line);
        }
        println!();
    }

    fn print_scores(&self, elapsed: Duration, mut reports: Vec<StatusReport>) {
        if self.quiet {
            return;
        }
        reports.sort_by_key(|report| report.philosopher);
        println!(
            "============== FINAL SCORES after {} ms ==============",
            elapsed.as_millis()
        );
        for report in &reports {
            println!("{}", report.philosopher_line);
            println!(" |- Left Fork: {}", report.left_fork_line);
            println!(" |- Right Fork: {}", report.right_fork_line);
        }
    }
}

fn outcome_kind<R>(outcome: &RoundOutcome<R>) -> &'static str {
    match outcome {
        RoundOutcome::Items(_) => "items",
        RoundOutcome::TimedOut { .. } => "timed_out",
        RoundOutcome::Cancelled => "cancelled",
        RoundOutcome::Idle => "idle",
    }
}
