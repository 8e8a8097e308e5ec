//! ForkResource - a shared two-state exclusive resource with a reservation phase.

use crate::error::SimError;
use crate::types::{ForkId, PhilosopherId};
use philo_env::Clock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Where a fork currently is in its lifecycle.
///
/// `Locked` is a non-exclusive reservation: it blocks a competing lock but
/// is not ownership, and must be converted to `Taken` or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkStatus {
    Free,
    Locked(PhilosopherId),
    Taken(PhilosopherId),
}

/// Cumulative usage counters for a fork, including the still-open interval
/// in the current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForkUsage {
    /// Time spent `Taken`
    pub used: Duration,
    /// Time spent `Free`
    pub available: Duration,
    /// Time spent `Locked`
    pub blocked: Duration,
    /// Failed lock/take attempts
    pub contention: u64,
}

struct ForkState {
    status: ForkStatus,
    /// Timestamp of the last successful transition
    since: Duration,
    used: Duration,
    available: Duration,
    blocked: Duration,
    contention: u64,
}

impl ForkState {
    /// Charges the interval since the last transition to the counter of
    /// the state being exited, then restarts the interval.
    fn settle(&mut self, now: Duration) {
        let elapsed = now.saturating_sub(self.since);
        match self.status {
            ForkStatus::Free => self.available += elapsed,
            ForkStatus::Locked(_) => self.blocked += elapsed,
            ForkStatus::Taken(_) => self.used += elapsed,
        }
        self.since = now;
    }
}

/// A single shared fork, contested by its two neighboring philosophers.
///
/// All operations run under the fork's own mutex and never block; "can't
/// acquire right now" is a boolean return, only an ownership violation on
/// [`Fork::put`] is an error.
pub struct Fork<C: Clock> {
    id: ForkId,
    clock: Arc<C>,
    state: Mutex<ForkState>,
}

impl<C: Clock> Fork<C> {
    /// Creates a free fork.
    pub fn new(id: ForkId, clock: Arc<C>) -> Self {
        let since = clock.now();
        Self {
            id,
            clock,
            state: Mutex::new(ForkState {
                status: ForkStatus::Free,
                since,
                used: Duration::ZERO,
                available: Duration::ZERO,
                blocked: Duration::ZERO,
                contention: 0,
            }),
        }
    }

    pub fn id(&self) -> ForkId {
        self.id
    }

    /// Reserves the fork. Succeeds iff the fork is `Free`.
    pub fn try_lock(&self, requester: PhilosopherId) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.status != ForkStatus::Free {
            state.contention += 1;
            return false;
        }
        state.settle(self.clock.now());
        state.status = ForkStatus::Locked(requester);
        true
    }

    /// Releases a reservation. No-op unless `Locked(requester)`.
    pub fn unlock(&self, requester: PhilosopherId) {
        let mut state = self.state.lock().unwrap();
        if state.status == ForkStatus::Locked(requester) {
            state.settle(self.clock.now());
            state.status = ForkStatus::Free;
        }
    }

    /// Converts a free fork, or the requester's own reservation, into
    /// exclusive ownership.
    pub fn try_take(&self, requester: PhilosopherId) -> bool {
        let mut state = self.state.lock().unwrap();
        let allowed =
            state.status == ForkStatus::Free || state.status == ForkStatus::Locked(requester);
        if !allowed {
            state.contention += 1;
            return false;
        }
        state.settle(self.clock.now());
        state.status = ForkStatus::Taken(requester);
        true
    }

    /// Puts the fork down. Requires `Taken(owner)`; anything else is a
    /// [`SimError::ResourceViolation`].
    pub fn put(&self, owner: PhilosopherId) -> Result<(), SimError> {
        let mut state = self.state.lock().unwrap();
        if state.status != ForkStatus::Taken(owner) {
            return Err(SimError::violation(self.id, owner, state.status));
        }
        state.settle(self.clock.now());
        state.status = ForkStatus::Free;
        Ok(())
    }

    /// Returns the exclusive owner, if any. A reservation is not ownership.
    pub fn holder(&self) -> Option<PhilosopherId> {
        match self.state.lock().unwrap().status {
            ForkStatus::Taken(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_locked_by(&self, philosopher: PhilosopherId) -> bool {
        self.state.lock().unwrap().status == ForkStatus::Locked(philosopher)
    }

    pub fn is_taken_by(&self, philosopher: PhilosopherId) -> bool {
        self.state.lock().unwrap().status == ForkStatus::Taken(philosopher)
    }

    /// Snapshot of the cumulative counters, charging the still-open
    /// interval to the current state without mutating it.
    pub fn usage(&self) -> ForkUsage {
        let state = self.state.lock().unwrap();
        let mut usage = ForkUsage {
            used: state.used,
            available: state.available,
            blocked: state.blocked,
            contention: state.contention,
        };
        let residual = self.clock.now().saturating_sub(state.since);
        match state.status {
            ForkStatus::Free => usage.available += residual,
            ForkStatus::Locked(_) => usage.blocked += residual,
            ForkStatus::Taken(_) => usage.used += residual,
        }
        usage
    }

    /// Human-readable status line, e.g. `Fork-2: in use (by Kant)`.
    pub fn status_line(&self, names: &[String]) -> String {
        match self.state.lock().unwrap().status {
            ForkStatus::Taken(p) => {
                let name = names.get(p.0).cloned().unwrap_or_else(|| p.to_string());
                format!("{}: in use (by {})", self.id, name)
            }
            _ => format!("{}: available", self.id),
        }
    }

    /// Human-readable usage breakdown over the elapsed simulation time.
    pub fn score_line(&self, elapsed: Duration) -> String {
        let usage = self.usage();
        let total = elapsed.as_millis() as f64;
        let percent = |d: Duration| {
            if total > 0.0 {
                d.as_millis() as f64 / total * 100.0
            } else {
                0.0
            }
        };
        format!(
            "{}: used {:.1}%, available {:.1}%, blocked {:.1}%",
            self.id,
            percent(usage.used),
            percent(usage.available),
            percent(usage.blocked)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use philo_env::{ManualClock, TokioClock};

    fn fork_with_manual_clock() -> (Arc<ManualClock>, Fork<ManualClock>) {
        let clock = ManualClock::shared();
        let fork = Fork::new(ForkId(0), clock.clone());
        (clock, fork)
    }

    #[test]
    fn test_lock_take_put_round_trip() {
        let (_clock, fork) = fork_with_manual_clock();
        let plato = PhilosopherId(0);
        let kant = PhilosopherId(1);

        assert!(fork.try_lock(plato));
        assert!(fork.is_locked_by(plato));
        assert!(!fork.try_lock(kant));

        assert!(fork.try_take(plato));
        assert!(fork.is_taken_by(plato));
        assert_eq!(fork.holder(), Some(plato));

        fork.put(plato).unwrap();
        assert_eq!(fork.holder(), None);

        // Once free again, a different philosopher can take it.
        assert!(fork.try_take(kant));
    }

    #[test]
    fn test_take_refused_while_locked_by_other() {
        let (_clock, fork) = fork_with_manual_clock();
        assert!(fork.try_lock(PhilosopherId(0)));
        assert!(!fork.try_take(PhilosopherId(1)));
        assert!(!fork.try_lock(PhilosopherId(1)));
    }

    #[test]
    fn test_unlock_only_releases_own_reservation() {
        let (_clock, fork) = fork_with_manual_clock();
        assert!(fork.try_lock(PhilosopherId(0)));

        fork.unlock(PhilosopherId(1));
        assert!(fork.is_locked_by(PhilosopherId(0)));

        fork.unlock(PhilosopherId(0));
        assert!(fork.try_lock(PhilosopherId(1)));
    }

    #[test]
    fn test_put_without_ownership_is_violation() {
        let (_clock, fork) = fork_with_manual_clock();
        let err = fork.put(PhilosopherId(0)).unwrap_err();
        assert!(matches!(err, SimError::ResourceViolation { .. }));

        assert!(fork.try_take(PhilosopherId(1)));
        let err = fork.put(PhilosopherId(0)).unwrap_err();
        assert!(err.to_string().contains("taken by P1"));
        // The violation must not disturb the real owner.
        assert!(fork.is_taken_by(PhilosopherId(1)));
    }

    #[test]
    fn test_usage_charges_exited_state() {
        let (clock, fork) = fork_with_manual_clock();
        let plato = PhilosopherId(0);

        clock.advance(Duration::from_millis(100)); // Free
        assert!(fork.try_lock(plato));
        clock.advance(Duration::from_millis(30)); // Locked
        assert!(fork.try_take(plato));
        clock.advance(Duration::from_millis(250)); // Taken
        fork.put(plato).unwrap();

        let usage = fork.usage();
        assert_eq!(usage.available, Duration::from_millis(100));
        assert_eq!(usage.blocked, Duration::from_millis(30));
        assert_eq!(usage.used, Duration::from_millis(250));
    }

    #[test]
    fn test_usage_includes_residual_interval() {
        let (clock, fork) = fork_with_manual_clock();
        assert!(fork.try_take(PhilosopherId(0)));
        clock.advance(Duration::from_millis(75));

        assert_eq!(fork.usage().used, Duration::from_millis(75));
        // Reading the counters must not close the interval.
        clock.advance(Duration::from_millis(25));
        assert_eq!(fork.usage().used, Duration::from_millis(100));
    }

    #[test]
    fn test_failed_attempts_count_contention() {
        let (_clock, fork) = fork_with_manual_clock();
        assert!(fork.try_take(PhilosopherId(0)));
        assert!(!fork.try_lock(PhilosopherId(1)));
        assert!(!fork.try_take(PhilosopherId(1)));
        assert_eq!(fork.usage().contention, 2);
    }

    #[test]
    fn test_status_line() {
        let (_clock, fork) = fork_with_manual_clock();
        let names = vec!["Plato".to_string(), "Kant".to_string()];
        assert_eq!(fork.status_line(&names), "Fork-0: available");

        assert!(fork.try_take(PhilosopherId(1)));
        assert_eq!(fork.status_line(&names), "Fork-0: in use (by Kant)");

        // A reservation does not show as ownership.
        fork.put(PhilosopherId(1)).unwrap();
        assert!(fork.try_lock(PhilosopherId(0)));
        assert_eq!(fork.status_line(&names), "Fork-0: available");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_take_has_single_winner() {
        let clock = TokioClock::shared();
        let fork = Arc::new(Fork::new(ForkId(0), clock));

        for _ in 0..1000 {
            let left = fork.clone();
            let right = fork.clone();
            let a = tokio::spawn(async move { left.try_take(PhilosopherId(0)) });
            let b = tokio::spawn(async move { right.try_take(PhilosopherId(1)) });
            let (a, b) = (a.await.unwrap(), b.await.unwrap());

            // Exactly one contender wins each round.
            assert!(a ^ b);

            let winner = if a { PhilosopherId(0) } else { PhilosopherId(1) };
            fork.put(winner).unwrap();
        }
    }
}
