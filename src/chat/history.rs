//! In-memory chat history for a room.
//!
//! Each room keeps the most recent delivered messages in a fixed-capacity
//! ring. History lives and dies with the room; nothing is persisted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// Default number of messages a room keeps.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One delivered chat message.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Display name of the sender.
    pub sender: String,
    /// Message body.
    pub body: String,
    /// When the message was delivered to the room.
    pub delivered_at: DateTime<Utc>,
}

impl LogEntry {
    /// Create a new log entry stamped with the current time.
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            delivered_at: Utc::now(),
        }
    }

    /// Format the entry for display.
    pub fn format(&self) -> String {
        format!("<{}> {}", self.sender, self.body)
    }
}

/// Fixed-capacity ring of the most recent messages in a room.
///
/// Pushing beyond capacity evicts the oldest entry.
#[derive(Debug)]
pub struct RoomLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl RoomLog {
    /// Create a log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
