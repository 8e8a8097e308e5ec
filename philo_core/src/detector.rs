//! SnapshotCollector / DeadlockDetector - the whole-table deadlock verdict.

use crate::channel::{ReportBus, RoundOutcome, SnapshotItem, SnapshotQuery};
use crate::shutdown::ShutdownToken;

use philo_env::Clock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Pause between collection rounds.
pub const DETECTOR_INTERVAL: Duration = Duration::from_millis(1000);

/// Deadline for one fan-in round; a round that misses it is inconclusive.
pub const COLLECT_DEADLINE: Duration = Duration::from_millis(1000);

/// The structured positive verdict, escalated to the supervisor together
/// with the batch that triggered it.
#[derive(Debug, Clone, Serialize)]
pub struct DeadlockReport {
    /// Collection round that produced the verdict
    pub round: u64,
    /// The triggering snapshot batch, one item per actor
    pub snapshot: Vec<SnapshotItem>,
}

/// Evaluates the global deadlock predicate over one collected batch.
///
/// Deadlock iff every actor reports both of its forks owned and nobody is
/// eating. Any eating actor or any free fork makes the round negative.
/// An empty batch is never a deadlock.
pub fn is_deadlock(items: &[SnapshotItem]) -> bool {
    if items.is_empty() {
        return false;
    }
    items
        .iter()
        .all(|item| !item.is_eating && !item.left_fork_free && !item.right_fork_free)
}

/// Periodically gathers one snapshot per registered actor and raises a
/// terminal verdict once the predicate holds.
///
/// The batch is a best-effort approximation: reports are taken under each
/// actor's local lock but not atomically across actors.
pub struct DeadlockDetector<C: Clock> {
    bus: ReportBus<SnapshotQuery, SnapshotItem>,
    clock: Arc<C>,
    shutdown: ShutdownToken,
    verdict_tx: oneshot::Sender<DeadlockReport>,
}

impl<C: Clock> DeadlockDetector<C> {
    pub fn new(
        bus: ReportBus<SnapshotQuery, SnapshotItem>,
        clock: Arc<C>,
        shutdown: ShutdownToken,
        verdict_tx: oneshot::Sender<DeadlockReport>,
    ) -> Self {
        Self {
            bus,
            clock,
            shutdown,
            verdict_tx,
        }
    }

    /// Runs collection rounds until a verdict or cancellation.
    pub async fn run(mut self) {
        info!(
            actors = self.bus.publisher_count(),
            "deadlock detector started"
        );
        let mut round: u64 = 0;

        while !self.shutdown.is_cancelled() {
            round += 1;
            let outcome = self
                .bus
                .collect(
                    SnapshotQuery { round },
                    &*self.clock,
                    COLLECT_DEADLINE,
                    &self.shutdown,
                )
                .await;

            match outcome {
                RoundOutcome::Items(items) => {
                    if is_deadlock(&items) {
                        error!(round, "DEADLOCK DETECTED");
                        for item in &items {
                            error!(
                                philosopher = %item.philosopher,
                                eating = item.is_eating,
                                left_fork_free = item.left_fork_free,
                                right_fork_free = item.right_fork_free,
                                "deadlock snapshot"
                            );
                        }
                        let _ = self.verdict_tx.send(DeadlockReport {
                            round,
                            snapshot: items,
                        });
                        return;
                    }
                    debug!(round, actors = items.len(), "round negative");
                }
                RoundOutcome::TimedOut { received, expected } => {
                    warn!(round, received, expected, "snapshot round timed out");
                }
                RoundOutcome::Cancelled => break,
                RoundOutcome::Idle => {
                    debug!(round, "no actors left to sample");
                }
            }

            tokio::select! {
                _ = self.clock.sleep(DETECTOR_INTERVAL) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }
        info!("deadlock detector stopped");
    }
}
