//! CompletionCoordinator - tracks active long-running actors and signals
//! overall shutdown when the last one finishes.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActivityState {
    active: usize,
    total_registered: u64,
}

/// Coordination primitive counting active long-running components.
///
/// Every philosopher, the detector and any host-side driver register at
/// startup; when the count returns to zero the single shutdown trigger
/// fires and [`CompletionCoordinator::wait_idle`] resolves. Holds no
/// simulation state.
#[derive(Debug, Clone)]
pub struct CompletionCoordinator {
    state: Arc<watch::Sender<ActivityState>>,
}

impl CompletionCoordinator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ActivityState {
            active: 0,
            total_registered: 0,
        });
        Self {
            state: Arc::new(tx),
        }
    }

    /// Registers one active actor; the returned guard checks it out again
    /// when dropped, so panicking tasks still complete.
    pub fn register(&self, name: &str) -> CompletionGuard {
        self.state.send_modify(|state| {
            state.active += 1;
            state.total_registered += 1;
        });
        debug!(actor = name, active = self.active(), "actor registered");
        CompletionGuard {
            coordinator: self.clone(),
            name: name.to_string(),
        }
    }

    fn complete(&self, name: &str) {
        self.state.send_modify(|state| {
            state.active = state.active.saturating_sub(1);
        });
        let active = self.active();
        debug!(actor = name, active, "actor completed");
        if active == 0 {
            info!("all simulation actors completed");
        }
    }

    /// Number of currently active actors.
    pub fn active(&self) -> usize {
        self.state.borrow().active
    }

    /// Resolves once at least one actor has registered and all of them
    /// have completed.
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if state.total_registered > 0 && state.active == 0 {
                    return;
                }
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CompletionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII registration handle; dropping it completes the actor.
pub struct CompletionGuard {
    coordinator: CompletionCoordinator,
    name: String,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.coordinator.complete(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_idle_fires_when_last_actor_completes() {
        let coordinator = CompletionCoordinator::new();
        let first = coordinator.register("Plato");
        let second = coordinator.register("Kant");
        assert_eq!(coordinator.active(), 2);

        let waiter = coordinator.clone();
        let idle = tokio::spawn(async move { waiter.wait_idle().await });

        drop(first);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!idle.is_finished(), "one actor is still active");

        drop(second);
        tokio::time::timeout(Duration::from_secs(1), idle)
            .await
            .expect("idle signal expected")
            .unwrap();
        assert_eq!(coordinator.active(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_after_everything_finished() {
        let coordinator = CompletionCoordinator::new();
        drop(coordinator.register("Plato"));
        // Late waiters must still observe the trigger.
        coordinator.wait_idle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_signal_before_first_registration() {
        let coordinator = CompletionCoordinator::new();
        let waiter = coordinator.clone();
        let idle = tokio::spawn(async move { waiter.wait_idle().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!idle.is_finished(), "nothing registered yet");

        drop(coordinator.register("Plato"));
        tokio::time::timeout(Duration::from_secs(1), idle)
            .await
            .expect("idle signal expected")
            .unwrap();
    }
}
