//! Core clock trait for the simulation environment.

use async_trait::async_trait;
use std::time::Duration;

/// The central interface for time interaction.
///
/// This trait abstracts the passage of time so that the simulation core
/// can run against real time in production and controlled time in tests.
///
/// # Implementations
///
/// - **Production**: [`crate::TokioClock`] - wraps `tokio::time`
/// - **Tests**: [`crate::ManualClock`] - virtual clock advanced explicitly
///
/// # Determinism
///
/// All durations in the core are measured with `now()` and all waits go
/// through `sleep()`, so a controlled implementation makes a whole
/// simulation run reproducible and fast.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Returns the current monotonic time since clock creation.
    ///
    /// Used for state timers, fork usage counters and elapsed-time stats.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`.
    /// In tests: advances the virtual clock.
    async fn sleep(&self, duration: Duration);
}
