//! Retry-budget bookkeeping for in-flight deliveries.
//!
//! One entry per delivery id (`"<channel index>|<alert id>"`) holding the
//! number of attempts left. Entries live only while a delivery is in flight.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Attempts given to each delivery unless configured otherwise.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

#[derive(Debug)]
pub struct Inventory {
    budget: u32,
    entries: RwLock<HashMap<String, u32>>,
}

impl Inventory {
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Start tracking `id` with the full budget. No-op if already tracked.
    pub fn register(&self, id: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(id.to_string()).or_insert(self.budget);
    }

    /// Consume one attempt and return what is left (never below zero).
    pub fn decrement(&self, id: &str) -> u32 {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(id) {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining
            }
            None => 0,
        }
    }

    pub fn deregister(&self, id: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Attempts left for `id`. Unknown ids report 0, the same as an
    /// exhausted delivery.
    pub fn remaining(&self, id: &str) -> u32 {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Number of deliveries currently tracked.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_BUDGET)
    }
}
