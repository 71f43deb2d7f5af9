// src/pipeline/backlog.rs
//
// Sale records drained from the counter but not yet written to the ledger.
// Bounded: when the sink stays down long enough, the oldest records go.

use crate::analysis::SaleRecord;
use std::collections::VecDeque;
use tracing::warn;

pub struct SaleBacklog {
    records: VecDeque<SaleRecord>,
    max_pending: usize,
}

impl SaleBacklog {
    pub fn new(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            records: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    /// Queue a record. Returns the record that was dropped to make room, if any.
    pub fn push(&mut self, record: SaleRecord) -> Option<SaleRecord> {
        let dropped = if self.records.len() >= self.max_pending {
            let oldest = self.records.pop_front();
            if let Some(old) = &oldest {
                warn!(
                    "Ledger backlog full ({} records), dropping sale #{}",
                    self.max_pending, old.count
                );
            }
            oldest
        } else {
            None
        };
        self.records.push_back(record);
        dropped
    }

    pub fn front(&self) -> Option<&SaleRecord> {
        self.records.front()
    }

    pub fn pop_front(&mut self) -> Option<SaleRecord> {
        self.records.pop_front()
    }

    pub fn pending_count(&self) -> usize {
        self.records.len()
    }
}
