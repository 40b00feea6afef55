//! Bounded record of previously entered command lines.

use std::collections::VecDeque;

/// Number of lines kept when no other capacity is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Most-recent-first list of submitted lines with a fixed capacity.
///
/// Index 0 is always the newest entry. Recording into a full store evicts
/// the oldest entry first, so `len() <= capacity()` holds at all times.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    /// Create an empty store holding at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert `line` as the newest entry.
    pub fn record(&mut self, line: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(line.into());
    }

    /// Entry at `index`, where 0 is the newest.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lines newest first, each prefixed with its zero-based display index.
    pub fn list(&self) -> impl Iterator<Item = String> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{} {}", i, line))
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
