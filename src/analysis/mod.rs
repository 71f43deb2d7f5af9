// src/analysis/mod.rs
//
// Sale counting core.
//
// Signal flow:
//   Tracked detections → sale_counter ─┬→ containment (box ⊃ pizza?)
//                                      ├→ association (already credited?)
//                                      └→ sales_ledger → drain_new_event()

pub mod association;
pub mod containment;
pub mod sale_counter;
pub mod sales_ledger;

pub use association::AssociationTable;
pub use containment::contains;
pub use sale_counter::{FrameOutcome, PairVerdict, SaleCounter};
pub use sales_ledger::{SaleRecord, SalesLedger};
