// src/analysis/sales_ledger.rs
//
// In-memory, append-only record of sales for one stream. The durable
// history lives in the ledger sink; this buffer only has to hand each
// new record to the caller once.

use crate::types::TrackId;
use chrono::NaiveDateTime;

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A single sale: when it happened and the running count it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub recorded_at: NaiveDateTime,
    pub count: u64,
    /// Box track that was credited, `None` when the tracker gave no id
    pub container_id: Option<TrackId>,
    /// Pizza track that was credited, `None` when the tracker gave no id
    pub content_id: Option<TrackId>,
}

impl SaleRecord {
    /// DD/MM/YYYY
    pub fn date_string(&self) -> String {
        self.recorded_at.format(DATE_FORMAT).to_string()
    }

    /// HH:MM:SS
    pub fn time_string(&self) -> String {
        self.recorded_at.format(TIME_FORMAT).to_string()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "date": self.date_string(),
            "time": self.time_string(),
            "count": self.count,
            "box_id": self.container_id,
            "pizza_id": self.content_id,
        })
    }
}

pub struct SalesLedger {
    events: Vec<SaleRecord>,
    pending: bool,
}

impl SalesLedger {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            pending: false,
        }
    }

    /// Append a sale. The count is post-increment, so the first sale is 1.
    pub fn record(
        &mut self,
        recorded_at: NaiveDateTime,
        container_id: Option<TrackId>,
        content_id: Option<TrackId>,
    ) -> &SaleRecord {
        let record = SaleRecord {
            recorded_at,
            count: self.events.len() as u64 + 1,
            container_id,
            content_id,
        };
        self.events.push(record);
        self.pending = true;
        &self.events[self.events.len() - 1]
    }

    /// Pop the latest sale if one was recorded since the last drain.
    pub fn drain_new_event(&mut self) -> Option<SaleRecord> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        self.events.last().cloned()
    }

    pub fn count(&self) -> u64 {
        self.events.len() as u64
    }

    pub fn history(&self) -> &[SaleRecord] {
        &self.events
    }
}

impl Default for SalesLedger {
    fn default() -> Self {
        Self::new()
    }
}
