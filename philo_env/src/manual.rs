//! Controlled-time clock for deterministic unit tests.

use crate::Clock;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Test clock backed by a virtual instant.
///
/// `sleep` advances the virtual time immediately and yields to the
/// scheduler, so code under test never waits in real time. `advance` and
/// `set` give tests exact control over the timestamps that instrumentation
/// code observes.
pub struct ManualClock {
    /// Current virtual time (nanoseconds since clock creation)
    virtual_time_ns: Arc<Mutex<u64>>,
}

impl ManualClock {
    /// Creates a new ManualClock at time zero.
    pub fn new() -> Self {
        Self {
            virtual_time_ns: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an Arc-wrapped clock for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances virtual time by the given duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self.virtual_time_ns.lock().unwrap();
        *time += duration.as_nanos() as u64;
    }

    /// Sets the virtual time to a specific value.
    pub fn set(&self, time: Duration) {
        let mut now = self.virtual_time_ns.lock().unwrap();
        *now = time.as_nanos() as u64;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ManualClock {
    fn clone(&self) -> Self {
        Self {
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
        }
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(*self.virtual_time_ns.lock().unwrap())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        // Let concurrently scheduled tasks run between virtual waits.
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));

        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new();
        clock.set(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_millis(40)).await;
        assert_eq!(clock.now(), Duration::from_millis(40));
    }

    #[test]
    fn test_manual_clock_clone_shares_time() {
        let clock1 = ManualClock::new();
        let clock2 = clock1.clone();

        clock1.advance(Duration::from_secs(5));

        // Both should see the same time
        assert_eq!(clock1.now(), clock2.now());
    }
}
