//! PhilosopherActor - the per-actor state machine driving think/eat cycles.

use crate::channel::{ReportPublisher, SnapshotItem, SnapshotQuery, StatusQuery, StatusReport};
use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::fork::Fork;
use crate::shutdown::ShutdownToken;
use crate::stats::PhilosopherStats;
use crate::strategy::ForkStrategy;
use crate::types::PhilosopherId;

use philo_env::Clock;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, trace};

/// The five phases of a philosopher's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhilosopherState {
    Thinking,
    /// Waiting to reserve the first fork
    Hungry,
    /// Converting the own reservation on the first fork into ownership
    TakingFirstFork,
    /// Reserving, then converting, the second fork
    TakingSecondFork,
    Eating,
}

impl fmt::Display for PhilosopherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PhilosopherState::Thinking => "Thinking",
            PhilosopherState::Hungry => "Hungry",
            PhilosopherState::TakingFirstFork => "Taking First Fork",
            PhilosopherState::TakingSecondFork => "Taking Second Fork",
            PhilosopherState::Eating => "Eating",
        };
        write!(f, "{label}")
    }
}

/// Shared view of a philosopher, read by reporters under the local lock.
#[derive(Debug)]
pub struct PhilosopherStatus {
    pub state: PhilosopherState,
    /// Clock time at which the current state was entered
    pub state_entered: Duration,
    pub meals_eaten: u64,
    pub hungry_time: Duration,
    /// Set when the actor aborted on a protocol violation
    pub fault: Option<String>,
}

/// One philosopher at the table.
///
/// Owned exclusively by its running task; everything observable lives in
/// the shared [`PhilosopherStatus`] handed to the actor's
/// [`PhilosopherProbe`].
pub struct Philosopher<C: Clock> {
    id: PhilosopherId,
    name: String,
    strategy: ForkStrategy<C>,
    status: Arc<Mutex<PhilosopherStatus>>,
    config: SimulationConfig,
    clock: Arc<C>,
    shutdown: ShutdownToken,
    rng: ChaCha8Rng,
}

impl<C: Clock> Philosopher<C> {
    /// Creates a philosopher. The timer RNG is derived from the master
    /// seed and the seat index, so runs are reproducible per seed.
    pub fn new(
        id: PhilosopherId,
        name: String,
        strategy: ForkStrategy<C>,
        config: SimulationConfig,
        clock: Arc<C>,
        shutdown: ShutdownToken,
    ) -> Self {
        let seed = config.seed.wrapping_mul(0x517cc1b727220a95) ^ id.0 as u64;
        let status = PhilosopherStatus {
            state: PhilosopherState::Thinking,
            state_entered: clock.now(),
            meals_eaten: 0,
            hungry_time: Duration::ZERO,
            fault: None,
        };
        Self {
            id,
            name,
            strategy,
            status: Arc::new(Mutex::new(status)),
            config,
            clock,
            shutdown,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> PhilosopherId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates the observation handle for this philosopher.
    ///
    /// `left` and `right` must be the same forks the actor's strategy was
    /// built from; `names` is the table roster for display lines.
    pub fn probe(
        &self,
        left: Arc<Fork<C>>,
        right: Arc<Fork<C>>,
        names: Arc<Vec<String>>,
    ) -> PhilosopherProbe<C> {
        PhilosopherProbe {
            id: self.id,
            name: self.name.clone(),
            status: Arc::clone(&self.status),
            left,
            right,
            names,
            clock: Arc::clone(&self.clock),
        }
    }

    /// Runs the state machine until cancellation or a fatal violation.
    ///
    /// On every exit path the cleanup releases any reservation and any
    /// held fork, so a dead actor never wedges the table.
    pub async fn run(mut self) {
        debug!(philosopher = %self.name, "joined the table");
        let result = self.drive().await;

        self.strategy.unlock_all();
        if let Err(err) = self.strategy.put_all() {
            error!(philosopher = %self.name, %err, "fork release failed during cleanup");
        }

        match result {
            Ok(()) => debug!(philosopher = %self.name, "left the table"),
            Err(err) => {
                error!(philosopher = %self.name, %err, "philosopher aborted");
                self.status.lock().unwrap().fault = Some(err.to_string());
            }
        }
    }

    async fn drive(&mut self) -> Result<(), SimError> {
        while !self.shutdown.is_cancelled() {
            let state = self.status.lock().unwrap().state;
            match state {
                PhilosopherState::Thinking => self.think().await,
                PhilosopherState::Hungry => self.reserve_first_fork().await,
                PhilosopherState::TakingFirstFork => self.take_first_fork().await,
                PhilosopherState::TakingSecondFork => self.take_second_fork().await,
                PhilosopherState::Eating => self.eat().await?,
            }
        }
        Ok(())
    }

    async fn think(&mut self) {
        let duration = self.config.thinking.sample(&mut self.rng);
        if self.pause(duration).await {
            self.transition(PhilosopherState::Hungry);
        }
    }

    /// Hungry: reserve the preferred fork, backing off while contended.
    async fn reserve_first_fork(&mut self) {
        let backoff = self.config.take_fork.sample(&mut self.rng);
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            if self.strategy.lock_preferred() {
                self.transition(PhilosopherState::TakingFirstFork);
                return;
            }
            if !self.pause(backoff).await {
                return;
            }
            self.add_hungry(backoff);
        }
    }

    /// Convert the reserved first fork into ownership after the pickup delay.
    async fn take_first_fork(&mut self) {
        let delay = self.config.take_fork.sample(&mut self.rng);
        if !self.pause(delay).await {
            return;
        }
        self.add_hungry(delay);
        if self.strategy.take_preferred() {
            self.transition(PhilosopherState::TakingSecondFork);
        } else {
            // The reservation is gone; start the acquisition over.
            self.strategy.unlock_all();
            self.transition(PhilosopherState::Hungry);
        }
    }

    /// Reserve the second fork (same backoff discipline), then take it.
    async fn take_second_fork(&mut self) {
        let backoff = self.config.take_fork.sample(&mut self.rng);
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            if self.strategy.lock_other() {
                break;
            }
            if !self.pause(backoff).await {
                return;
            }
            self.add_hungry(backoff);
        }
        if !self.pause(backoff).await {
            return;
        }
        self.add_hungry(backoff);
        if self.strategy.take_other() {
            self.transition(PhilosopherState::Eating);
        } else {
            self.strategy.unlock_all();
        }
    }

    async fn eat(&mut self) -> Result<(), SimError> {
        let duration = self.config.eating.sample(&mut self.rng);
        if !self.pause(duration).await {
            return Ok(());
        }
        let meals = {
            let mut status = self.status.lock().unwrap();
            status.meals_eaten += 1;
            status.meals_eaten
        };
        debug!(philosopher = %self.name, meals, "finished a meal");
        self.strategy.put_all()?;
        self.transition(PhilosopherState::Thinking);
        Ok(())
    }

    /// Sleeps for `duration`; returns `false` if cancelled mid-wait.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.clock.sleep(duration) => true,
            _ = self.shutdown.cancelled() => false,
        }
    }

    fn transition(&self, next: PhilosopherState) {
        let now = self.clock.now();
        let mut status = self.status.lock().unwrap();
        trace!(philosopher = %self.name, from = %status.state, to = %next, "state change");
        status.state = next;
        status.state_entered = now;
    }

    fn add_hungry(&self, waited: Duration) {
        self.status.lock().unwrap().hungry_time += waited;
    }
}

/// Observation handle for one philosopher: produces snapshot items and
/// status reports, and yields the final stats.
pub struct PhilosopherProbe<C: Clock> {
    id: PhilosopherId,
    name: String,
    status: Arc<Mutex<PhilosopherStatus>>,
    left: Arc<Fork<C>>,
    right: Arc<Fork<C>>,
    names: Arc<Vec<String>>,
    clock: Arc<C>,
}

impl<C: Clock> Clone for PhilosopherProbe<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            status: Arc::clone(&self.status),
            left: Arc::clone(&self.left),
            right: Arc::clone(&self.right),
            names: Arc::clone(&self.names),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock> PhilosopherProbe<C> {
    pub fn id(&self) -> PhilosopherId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produces one snapshot item under the local lock.
    ///
    /// Fork freedom means "nobody owns it"; a reservation still counts as
    /// free, mirroring what the deadlock predicate needs to see.
    pub fn snapshot(&self) -> SnapshotItem {
        let status = self.status.lock().unwrap();
        SnapshotItem {
            philosopher: self.id,
            is_eating: status.state == PhilosopherState::Eating,
            left_fork_free: self.left.holder().is_none(),
            right_fork_free: self.right.holder().is_none(),
        }
    }

    /// Current-state block for the console view.
    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            philosopher: self.id,
            philosopher_line: self.status_line(),
            left_fork_line: self.left.status_line(&self.names),
            right_fork_line: self.right.status_line(&self.names),
        }
    }

    /// Final-score block over the elapsed simulation time.
    pub fn score_report(&self, elapsed: Duration) -> StatusReport {
        StatusReport {
            philosopher: self.id,
            philosopher_line: self.score_line(elapsed),
            left_fork_line: self.left.score_line(elapsed),
            right_fork_line: self.right.score_line(elapsed),
        }
    }

    /// e.g. `Kant: Hungry (120 ms), meals: 3`
    pub fn status_line(&self) -> String {
        let status = self.status.lock().unwrap();
        let timer = self.clock.now().saturating_sub(status.state_entered);
        format!(
            "{}: {} ({} ms), meals: {}",
            self.name,
            status.state,
            timer.as_millis(),
            status.meals_eaten
        )
    }

    /// e.g. `Kant: throughput 0.0123 meals/ms, hungry 432 ms (4.3%)`
    pub fn score_line(&self, elapsed: Duration) -> String {
        let status = self.status.lock().unwrap();
        let elapsed_ms = elapsed.as_millis() as f64;
        let throughput = if elapsed_ms > 0.0 {
            status.meals_eaten as f64 / elapsed_ms
        } else {
            0.0
        };
        let hungry_ms = status.hungry_time.as_millis();
        let hungry_percent = if elapsed_ms > 0.0 {
            hungry_ms as f64 / elapsed_ms * 100.0
        } else {
            0.0
        };
        format!(
            "{}: throughput {:.4} meals/ms, hungry {} ms ({:.1}%)",
            self.name, throughput, hungry_ms, hungry_percent
        )
    }

    pub fn stats(&self) -> PhilosopherStats {
        let status = self.status.lock().unwrap();
        PhilosopherStats {
            id: self.id,
            name: self.name.clone(),
            meals_eaten: status.meals_eaten,
            hungry_time_ms: status.hungry_time.as_millis() as u64,
        }
    }

    pub fn fault(&self) -> Option<String> {
        self.status.lock().unwrap().fault.clone()
    }

    /// Answers report requests until both buses are gone.
    ///
    /// Runs as a sibling task of the state machine so reports are served
    /// even while the actor sleeps. Publishing blocks when the fan-in
    /// channel is full, which is the backpressure the collectors rely on.
    pub async fn serve(
        self,
        mut snapshots: ReportPublisher<SnapshotQuery, SnapshotItem>,
        mut statuses: ReportPublisher<StatusQuery, StatusReport>,
    ) {
        let mut snapshots_open = true;
        let mut statuses_open = true;
        while snapshots_open || statuses_open {
            tokio::select! {
                request = snapshots.next_request(), if snapshots_open => {
                    match request {
                        Some(query) => {
                            let item = self.snapshot();
                            trace!(philosopher = %self.name, round = query.round, "snapshot published");
                            if !snapshots.publish(item).await {
                                snapshots_open = false;
                            }
                        }
                        None => snapshots_open = false,
                    }
                }
                request = statuses.next_request(), if statuses_open => {
                    match request {
                        Some(StatusQuery::Current) => {
                            if !statuses.publish(self.status_report()).await {
                                statuses_open = false;
                            }
                        }
                        Some(StatusQuery::Scores { elapsed }) => {
                            if !statuses.publish(self.score_report(elapsed)).await {
                                statuses_open = false;
                            }
                        }
                        None => statuses_open = false,
                    }
                }
            }
        }
        trace!(philosopher = %self.name, "reporter finished");
    }
}
