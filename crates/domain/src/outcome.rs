//! Per-item results for bulk operations that must not stop at the first
//! failure.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure<K> {
    pub id: K,
    pub reason: String,
}

/// What a bulk operation managed to do, item by item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome<K> {
    pub updated: Vec<K>,
    pub failed: Vec<BulkFailure<K>>,
}

impl<K> Default for BulkOutcome<K> {
    fn default() -> Self {
        Self {
            updated: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<K> BulkOutcome<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, id: K) {
        self.updated.push(id);
    }

    pub fn record_failure(&mut self, id: K, reason: impl std::fmt::Display) {
        self.failed.push(BulkFailure {
            id,
            reason: reason.to_string(),
        });
    }

    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
