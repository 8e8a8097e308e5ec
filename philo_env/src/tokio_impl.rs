//! Production implementation of Clock using Tokio.

use crate::Clock;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Production clock backed by Tokio.
///
/// This is the "real" implementation used in deployments. Time comes from
/// `tokio::time`, which means a paused tokio runtime (as used by the
/// scenario tests) drives this clock virtually with no code changes.
pub struct TokioClock {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioClock {
    /// Creates a new TokioClock.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped clock for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_clock_time() {
        let clock = TokioClock::new();
        let t1 = clock.now();
        clock.sleep(Duration::from_millis(10)).await;
        let t2 = clock.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_paused_runtime() {
        let clock = TokioClock::new();

        // Under a paused runtime the sleep completes instantly but the
        // observed duration still elapses.
        let t1 = clock.now();
        clock.sleep(Duration::from_secs(3600)).await;
        assert!(clock.now() - t1 >= Duration::from_secs(3600));
    }
}
