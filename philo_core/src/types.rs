//! Identifiers and the philosopher name roster.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a philosopher by its seat index in the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhilosopherId(pub usize);

impl fmt::Display for PhilosopherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Identifies a fork by its position in the ring.
///
/// Fork *i* sits between philosopher *i* (its right fork) and philosopher
/// *(i-1) mod N* (its left fork); every fork is shared by exactly two
/// neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForkId(pub usize);

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fork-{}", self.0)
    }
}

/// Fixed roster of philosopher names, assigned by seat index.
pub const PHILOSOPHER_NAMES: [&str; 10] = [
    "Plato",
    "Kant",
    "Aristotle",
    "Descartes",
    "Nietzsche",
    "Socrates",
    "Spinoza",
    "Hume",
    "Locke",
    "Confucius",
];

/// Returns the display name for a seat index, cycling past the roster.
pub fn philosopher_name(index: usize) -> String {
    let name = PHILOSOPHER_NAMES[index % PHILOSOPHER_NAMES.len()];
    if index < PHILOSOPHER_NAMES.len() {
        name.to_string()
    } else {
        format!("{} #{}", name, index / PHILOSOPHER_NAMES.len() + 1)
    }
}
