// src/pipeline/metrics.rs
//
// Per-stream run statistics. Logged as JSON when a stream finishes.

use crate::analysis::FrameOutcome;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: u64,
    pub frames_evaluated: u64,
    pub contained_pairs: u64,
    pub sales_recorded: u64,
    pub stable_matches: u64,
    pub conflicts_suppressed: u64,
    pub untracked_skipped: u64,
    pub records_persisted: u64,
    pub sink_failures: u64,
    pub records_dropped: u64,
    pub malformed_lines: u64,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            frames_evaluated: 0,
            contained_pairs: 0,
            sales_recorded: 0,
            stable_matches: 0,
            conflicts_suppressed: 0,
            untracked_skipped: 0,
            records_persisted: 0,
            sink_failures: 0,
            records_dropped: 0,
            malformed_lines: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_frame(&mut self, outcome: &FrameOutcome) {
        self.total_frames += 1;
        if outcome.evaluated {
            self.frames_evaluated += 1;
        }
        self.contained_pairs += outcome.contained_pairs as u64;
        self.sales_recorded += outcome.new_sales as u64;
        self.stable_matches += outcome.stable_matches as u64;
        self.conflicts_suppressed += outcome.conflicts as u64;
        self.untracked_skipped += outcome.untracked_skipped as u64;
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.total_frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self, total_sales: u64) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            fps: self.fps(),
            frames_evaluated: self.frames_evaluated,
            contained_pairs: self.contained_pairs,
            sales_recorded: self.sales_recorded,
            total_sales,
            stable_matches: self.stable_matches,
            conflicts_suppressed: self.conflicts_suppressed,
            untracked_skipped: self.untracked_skipped,
            records_persisted: self.records_persisted,
            sink_failures: self.sink_failures,
            records_dropped: self.records_dropped,
            malformed_lines: self.malformed_lines,
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub frames_evaluated: u64,
    pub contained_pairs: u64,
    pub sales_recorded: u64,
    pub total_sales: u64,
    pub stable_matches: u64,
    pub conflicts_suppressed: u64,
    pub untracked_skipped: u64,
    pub records_persisted: u64,
    pub sink_failures: u64,
    pub records_dropped: u64,
    pub malformed_lines: u64,
    pub elapsed_secs: f64,
}
