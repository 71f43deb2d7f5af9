// src/lib.rs
//
// Pizza sale counting from tracked detections.
//
//   detection_source → pipeline::StreamProcessor → analysis::SaleCounter
//                                                → ledger_sink (CSV / JSONL)

pub mod analysis;
pub mod config;
pub mod detection_source;
pub mod ledger_sink;
pub mod pipeline;
pub mod types;

pub use analysis::{contains, SaleCounter, SaleRecord};
pub use types::{Config, Detection, TrackId, UntrackedPolicy};
