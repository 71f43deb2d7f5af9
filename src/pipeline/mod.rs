// src/pipeline/mod.rs

pub mod backlog;
pub mod metrics;
pub mod orchestrator;

pub use backlog::SaleBacklog;
pub use metrics::{MetricsSummary, PipelineMetrics};
pub use orchestrator::{run_stream, FrameReport, StreamProcessor};
