//! Error types for the simulation core.

use crate::fork::ForkStatus;
use crate::types::{ForkId, PhilosopherId};
use thiserror::Error;

/// Errors that can occur in the simulation core.
///
/// Ordinary "can't acquire right now" outcomes are boolean returns on the
/// fork operations, never errors; cancellation is a clean exit. Only
/// invalid configuration and ownership violations surface here.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// Invalid configuration; the simulation never starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A fork was released by an actor that does not own it.
    ///
    /// This is a protocol bug in the caller, fatal to that actor's loop.
    #[error("resource violation: {fork} released by {caller} while {held}")]
    ResourceViolation {
        fork: ForkId,
        caller: PhilosopherId,
        held: String,
    },

    /// A simulation task could not be joined at shutdown.
    #[error("task join failed: {0}")]
    Join(String),
}

impl SimError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a resource violation from the fork's observed status.
    pub fn violation(fork: ForkId, caller: PhilosopherId, status: ForkStatus) -> Self {
        let held = match status {
            ForkStatus::Free => "free".to_string(),
            ForkStatus::Locked(by) => format!("locked by {}", by),
            ForkStatus::Taken(by) => format!("taken by {}", by),
        };
        Self::ResourceViolation { fork, caller, held }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_message() {
        let err = SimError::violation(ForkId(2), PhilosopherId(0), ForkStatus::Taken(PhilosopherId(4)));
        assert_eq!(
            err.to_string(),
            "resource violation: Fork-2 released by P0 while taken by P4"
        );
    }
}
