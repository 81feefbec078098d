//! Combat Log
//!
//! Bounded, timestamp-prefixed message history shown to the player.

use std::collections::VecDeque;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Maximum retained log entries.
pub const MAX_COMBAT_LOGS: usize = 10;

/// FIFO log capped at [`MAX_COMBAT_LOGS`] entries. Oldest entries are evicted first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatLog {
    entries: VecDeque<String>,
}

impl CombatLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `[HH:MM:SS] message`, evicting from the front past the cap.
    pub fn push(&mut self, at: DateTime<Utc>, message: impl AsRef<str>) {
        self.entries
            .push_back(format!("[{}] {}", at.format("%H:%M:%S"), message.as_ref()));
        while self.entries.len() > MAX_COMBAT_LOGS {
            self.entries.pop_front();
        }
    }

    /// Keep only the newest `keep` entries.
    pub fn prune(&mut self, keep: usize) {
        while self.entries.len() > keep {
            self.entries.pop_front();
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Newest entry.
    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    /// True if any entry contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.contains(needle))
    }
}
