//! Typed fan-out/fan-in report channels between actors and collectors.
//!
//! Each collector (the deadlock detector, the status printer) owns a
//! [`ReportBus`]. Actors register once at startup and receive a
//! [`ReportPublisher`]: a private bounded request queue plus a sender into
//! the bus's shared bounded item channel. A collection round broadcasts a
//! request to every live publisher, then reads exactly one item back per
//! publisher. A publisher that went away is pruned at the next fan-out,
//! shrinking the expected fan-in count (implicit unregister).

use crate::shutdown::ShutdownToken;
use crate::types::PhilosopherId;
use philo_env::Clock;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Capacity of each publisher's private request queue.
const REQUEST_QUEUE: usize = 4;

/// Fan-out request asking every actor for a deadlock-analysis snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotQuery {
    /// Collection round this request belongs to
    pub round: u64,
}

/// One actor's report for deadlock analysis, produced under its local
/// lock, consumed exactly once per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotItem {
    pub philosopher: PhilosopherId,
    pub is_eating: bool,
    pub left_fork_free: bool,
    pub right_fork_free: bool,
}

/// Fan-out request asking every actor for human-readable status.
#[derive(Debug, Clone, Copy)]
pub enum StatusQuery {
    /// Current state lines for the live console view
    Current,
    /// Final score lines over the elapsed simulation time
    Scores { elapsed: Duration },
}

/// One actor's human-readable status block.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub philosopher: PhilosopherId,
    pub philosopher_line: String,
    pub left_fork_line: String,
    pub right_fork_line: String,
}

/// Outcome of one collection round.
#[derive(Debug)]
pub enum RoundOutcome<R> {
    /// One item per live publisher
    Items(Vec<R>),
    /// The deadline elapsed before every publisher answered
    TimedOut { received: usize, expected: usize },
    /// The shared shutdown signal fired mid-round
    Cancelled,
    /// No publishers are registered
    Idle,
}

/// Collector side of the report protocol.
pub struct ReportBus<Q: Clone, R> {
    publishers: Vec<mpsc::Sender<Q>>,
    item_tx: mpsc::Sender<R>,
    item_rx: mpsc::Receiver<R>,
}

impl<Q: Clone, R> ReportBus<Q, R> {
    /// Creates a bus whose fan-in channel holds up to `capacity` items.
    ///
    /// Producers block once the channel is full, which bounds memory and
    /// serializes report bursts.
    pub fn new(capacity: usize) -> Self {
        let (item_tx, item_rx) = mpsc::channel(capacity.max(1));
        Self {
            publishers: Vec::new(),
            item_tx,
            item_rx,
        }
    }

    /// Registers one publisher. Called once per actor at startup.
    pub fn register(&mut self) -> ReportPublisher<Q, R> {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE);
        self.publishers.push(request_tx);
        ReportPublisher {
            requests: request_rx,
            items: self.item_tx.clone(),
        }
    }

    /// Number of currently registered publishers.
    pub fn publisher_count(&self) -> usize {
        self.publishers.len()
    }

    /// Runs one fan-out/fan-in round.
    ///
    /// Broadcasts `request`, then performs a blocking read of exactly one
    /// item per notified publisher, bounded by `deadline` and the shared
    /// shutdown signal.
    pub async fn collect<C: Clock>(
        &mut self,
        request: Q,
        clock: &C,
        deadline: Duration,
        shutdown: &ShutdownToken,
    ) -> RoundOutcome<R> {
        // Discard any stragglers from an earlier timed-out round.
        while self.item_rx.try_recv().is_ok() {}

        let mut expected = 0;
        self.publishers.retain(|tx| match tx.try_send(request.clone()) {
            Ok(()) => {
                expected += 1;
                true
            }
            // Still draining a previous request; it answers that one, not
            // this round.
            Err(TrySendError::Full(_)) => true,
            // Receiver dropped: the actor is gone, unregister it.
            Err(TrySendError::Closed(_)) => false,
        });

        if expected == 0 {
            return RoundOutcome::Idle;
        }

        let mut items = Vec::with_capacity(expected);
        let mut timeout = clock.sleep(deadline);
        loop {
            tokio::select! {
                item = self.item_rx.recv() => {
                    // item_tx is held by the bus itself, so recv never sees
                    // a closed channel here.
                    if let Some(item) = item {
                        items.push(item);
                        if items.len() == expected {
                            return RoundOutcome::Items(items);
                        }
                    }
                }
                _ = &mut timeout => {
                    return RoundOutcome::TimedOut { received: items.len(), expected };
                }
                _ = shutdown.cancelled() => {
                    return RoundOutcome::Cancelled;
                }
            }
        }
    }
}

/// Actor side of the report protocol.
pub struct ReportPublisher<Q, R> {
    requests: mpsc::Receiver<Q>,
    items: mpsc::Sender<R>,
}

impl<Q, R> ReportPublisher<Q, R> {
    /// Waits for the next request. Returns `None` once the bus is gone.
    pub async fn next_request(&mut self) -> Option<Q> {
        self.requests.recv().await
    }

    /// Publishes one item, blocking while the fan-in channel is full.
    /// Returns `false` once the bus is gone.
    pub async fn publish(&self, item: R) -> bool {
        self.items.send(item).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use philo_env::TokioClock;

    #[tokio::test]
    async fn test_round_trip_collects_one_item_per_publisher() {
        let clock = TokioClock::new();
        let shutdown = ShutdownToken::new();
        let mut bus: ReportBus<SnapshotQuery, usize> = ReportBus::new(4);

        for index in 0..3 {
            let mut publisher = bus.register();
            tokio::spawn(async move {
                while let Some(query) = publisher.next_request().await {
                    if !publisher.publish(index + query.round as usize).await {
                        break;
                    }
                }
            });
        }
        assert_eq!(bus.publisher_count(), 3);

        match bus
            .collect(
                SnapshotQuery { round: 0 },
                &clock,
                Duration::from_secs(5),
                &shutdown,
            )
            .await
        {
            RoundOutcome::Items(mut items) => {
                items.sort_unstable();
                assert_eq!(items, vec![0, 1, 2]);
            }
            other => panic!("expected items, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_publisher_is_unregistered() {
        let clock = TokioClock::new();
        let shutdown = ShutdownToken::new();
        let mut bus: ReportBus<SnapshotQuery, u32> = ReportBus::new(4);

        let mut alive = bus.register();
        let dead = bus.register();
        drop(dead);

        tokio::spawn(async move {
            while let Some(_query) = alive.next_request().await {
                if !alive.publish(7).await {
                    break;
                }
            }
        });

        match bus
            .collect(
                SnapshotQuery { round: 1 },
                &clock,
                Duration::from_secs(5),
                &shutdown,
            )
            .await
        {
            RoundOutcome::Items(items) => assert_eq!(items, vec![7]),
            other => panic!("expected items, got {:?}", other),
        }
        assert_eq!(bus.publisher_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_round_times_out() {
        let clock = TokioClock::new();
        let shutdown = ShutdownToken::new();
        let mut bus: ReportBus<SnapshotQuery, u32> = ReportBus::new(4);

        // Registered but never serviced.
        let _silent = bus.register();

        match bus
            .collect(
                SnapshotQuery { round: 1 },
                &clock,
                Duration::from_millis(100),
                &shutdown,
            )
            .await
        {
            RoundOutcome::TimedOut { received, expected } => {
                assert_eq!(received, 0);
                assert_eq!(expected, 1);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_bus_reports_idle() {
        let clock = TokioClock::new();
        let shutdown = ShutdownToken::new();
        let mut bus: ReportBus<SnapshotQuery, u32> = ReportBus::new(4);

        match bus
            .collect(
                SnapshotQuery { round: 1 },
                &clock,
                Duration::from_millis(10),
                &shutdown,
            )
            .await
        {
            RoundOutcome::Idle => {}
            other => panic!("expected idle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_collection() {
        let clock = TokioClock::new();
        let shutdown = ShutdownToken::new();
        let mut bus: ReportBus<SnapshotQuery, u32> = ReportBus::new(4);
        let _silent = bus.register();

        shutdown.cancel();
        match bus
            .collect(
                SnapshotQuery { round: 1 },
                &clock,
                Duration::from_secs(60),
                &shutdown,
            )
            .await
        {
            RoundOutcome::Cancelled => {}
            other => panic!("expected cancelled, got {:?}", other),
        }
    }
}
