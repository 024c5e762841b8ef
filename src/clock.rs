//! # Summary
//!
//! Lamport's logical clock. Every send and internal event calls `tick`,
//! and every receive calls `observe` with the remote timestamp before the
//! message is acted upon.

use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Clock(u64);

impl Clock {
    pub fn new() -> Self {
        Clock(0)
    }

    /// Current logical time.
    pub fn time(&self) -> u64 {
        self.0
    }

    /// Advances the clock by one and returns the new time.
    /// Saturates at `u64::MAX`.
    pub fn tick(&mut self) -> u64 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    /// Merges a remote timestamp: `max(local, remote) + 1`.
    /// Saturates at `u64::MAX`.
    pub fn observe(&mut self, remote: u64) -> u64 {
        self.0 = std::cmp::max(self.0, remote).saturating_add(1);
        self.0
    }
}

impl std::fmt::Display for Clock {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}
