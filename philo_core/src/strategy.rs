//! Fork acquisition ordering - the arbitration policy that breaks deadlock.

use crate::error::SimError;
use crate::fork::Fork;
use crate::types::PhilosopherId;
use philo_env::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which acquisition ordering the table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationMode {
    /// Exactly one philosopher acquires forks in reverse order, breaking
    /// the cyclic wait. This is the mode that keeps the table live.
    Asymmetric,
    /// Every philosopher uses the same order. Exists to demonstrate the
    /// deadlock and exercise the detector.
    Symmetric,
}

impl ArbitrationMode {
    /// Whether the philosopher at `index` is the single left-handed seat.
    pub fn is_left_handed(&self, index: usize) -> bool {
        matches!(self, ArbitrationMode::Asymmetric) && index == 0
    }
}

impl fmt::Display for ArbitrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbitrationMode::Asymmetric => write!(f, "asymmetric"),
            ArbitrationMode::Symmetric => write!(f, "symmetric"),
        }
    }
}

/// Per-philosopher acquisition policy.
///
/// Fixes, at construction, which of the two forks is attempted first and
/// exposes a uniform vocabulary so the state machine never cares about
/// handedness. Everyone goes left-fork-first except the single left-handed
/// philosopher, who goes right-fork-first.
pub struct ForkStrategy<C: Clock> {
    owner: PhilosopherId,
    preferred: Arc<Fork<C>>,
    other: Arc<Fork<C>>,
}

impl<C: Clock> ForkStrategy<C> {
    /// Builds the policy for one philosopher.
    pub fn new(
        owner: PhilosopherId,
        left: Arc<Fork<C>>,
        right: Arc<Fork<C>>,
        is_left_handed: bool,
    ) -> Self {
        let (preferred, other) = if is_left_handed {
            (right, left)
        } else {
            (left, right)
        };
        Self {
            owner,
            preferred,
            other,
        }
    }

    /// Reserves the first fork. Never blocks.
    pub fn lock_preferred(&self) -> bool {
        self.preferred.try_lock(self.owner)
    }

    /// Reserves the second fork. Never blocks.
    pub fn lock_other(&self) -> bool {
        self.other.try_lock(self.owner)
    }

    /// Converts the first fork's reservation (or a free fork) to ownership.
    pub fn take_preferred(&self) -> bool {
        self.preferred.try_take(self.owner)
    }

    /// Converts the second fork's reservation (or a free fork) to ownership.
    pub fn take_other(&self) -> bool {
        self.other.try_take(self.owner)
    }

    pub fn has_preferred(&self) -> bool {
        self.preferred.is_taken_by(self.owner)
    }

    pub fn has_other(&self) -> bool {
        self.other.is_taken_by(self.owner)
    }

    pub fn is_any_fork_locked_by_me(&self) -> bool {
        self.preferred.is_locked_by(self.owner) || self.other.is_locked_by(self.owner)
    }

    /// Releases any reservation held by the owner. Idempotent: safe from
    /// cleanup paths where the holding state is uncertain.
    pub fn unlock_all(&self) {
        if self.preferred.is_locked_by(self.owner) {
            self.preferred.unlock(self.owner);
        }
        if self.other.is_locked_by(self.owner) {
            self.other.unlock(self.owner);
        }
    }

    /// Puts down every fork the owner holds. Idempotent; the ownership
    /// check inside [`Fork::put`] still guards each release.
    pub fn put_all(&self) -> Result<(), SimError> {
        if self.preferred.is_taken_by(self.owner) {
            self.preferred.put(self.owner)?;
        }
        if self.other.is_taken_by(self.owner) {
            self.other.put(self.owner)?;
        }
        Ok(())
    }
}
