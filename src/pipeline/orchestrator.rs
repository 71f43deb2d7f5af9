// src/pipeline/orchestrator.rs
//
// Per-stream control loop: ingest → drain → persist, once per frame.
// The counter's state is never rolled back when the ledger write fails;
// the record stays in the backlog and is retried on the next frame.

use super::backlog::SaleBacklog;
use super::metrics::{MetricsSummary, PipelineMetrics};
use crate::analysis::{SaleCounter, SaleRecord};
use crate::detection_source::{stream_name, DetectionLogReader, FrameInput};
use crate::ledger_sink::{open_sink, LedgerSink};
use crate::types::Config;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_id: u64,
    /// Cumulative sales after this frame
    pub count: u64,
    /// Sale drained from the counter on this frame
    pub new_event: Option<SaleRecord>,
}

pub struct StreamProcessor {
    name: String,
    counter: SaleCounter,
    sink: Box<dyn LedgerSink>,
    backlog: SaleBacklog,
    metrics: PipelineMetrics,
}

impl StreamProcessor {
    pub fn new(name: &str, config: &Config, sink: Box<dyn LedgerSink>) -> Self {
        Self {
            name: name.to_string(),
            counter: SaleCounter::from_config(config),
            sink,
            backlog: SaleBacklog::new(config.ledger.max_pending),
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn process_frame(&mut self, frame: &FrameInput) -> Result<FrameReport> {
        self.process_frame_at(frame, Local::now().naive_local())
    }

    /// Run one frame through the counter and forward any new sale to the
    /// ledger. An `Err` means only that persistence failed; the count and
    /// credits already reflect this frame.
    pub fn process_frame_at(
        &mut self,
        frame: &FrameInput,
        now: NaiveDateTime,
    ) -> Result<FrameReport> {
        let outcome = self.counter.ingest_frame_at(&frame.detections, now);
        self.metrics.record_frame(&outcome);

        if outcome.conflicts > 0 {
            debug!(
                "[{}] frame {}: {} conflicting match(es) suppressed",
                self.name, frame.frame_id, outcome.conflicts
            );
        }

        let new_event = self.counter.drain_new_event();
        if let Some(record) = &new_event {
            if self.backlog.push(record.clone()).is_some() {
                self.metrics.records_dropped += 1;
            }
        }

        self.flush_backlog()
            .with_context(|| format!("[{}] frame {}", self.name, frame.frame_id))?;

        Ok(FrameReport {
            frame_id: frame.frame_id,
            count: outcome.count,
            new_event,
        })
    }

    /// Write queued records in order, stopping at the first failure.
    pub fn flush_backlog(&mut self) -> Result<()> {
        while let Some(record) = self.backlog.front() {
            if let Err(e) = self.sink.append(record) {
                self.metrics.sink_failures += 1;
                let count = record.count;
                return Err(e.context(format!(
                    "persisting sale #{} ({} pending)",
                    count,
                    self.backlog.pending_count()
                )));
            }
            self.backlog.pop_front();
            self.metrics.records_persisted += 1;
        }
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.counter.count()
    }

    pub fn pending_records(&self) -> usize {
        self.backlog.pending_count()
    }

    pub fn metrics_mut(&mut self) -> &mut PipelineMetrics {
        &mut self.metrics
    }

    pub fn summary(&self) -> MetricsSummary {
        self.metrics.summary(self.counter.count())
    }
}

/// Process one detection log end to end with a fresh counter and ledger.
pub fn run_stream(path: &Path, config: &Config) -> Result<MetricsSummary> {
    let name = stream_name(path);
    let mut reader = DetectionLogReader::open(path)?;
    let sink = open_sink(&config.ledger, &name)?;
    info!("Ledger for {}: {}", name, sink.path().display());

    let mut processor = StreamProcessor::new(&name, config, sink);
    let mut read_error = None;

    for frame in reader.by_ref() {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                read_error = Some(e.context(format!("reading {}", path.display())));
                break;
            }
        };
        match processor.process_frame(&frame) {
            Ok(report) => {
                if let Some(record) = report.new_event {
                    info!(
                        "[{}] frame {}: sales = {} ({} {})",
                        name,
                        report.frame_id,
                        report.count,
                        record.date_string(),
                        record.time_string()
                    );
                }
            }
            Err(e) => warn!("⚠️  Ledger write failed: {:#}", e),
        }
    }

    if let Err(e) = processor.flush_backlog() {
        warn!(
            "⚠️  {} sale record(s) could not be persisted: {:#}",
            processor.pending_records(),
            e
        );
    }

    processor.metrics_mut().malformed_lines = reader.malformed_lines();
    let summary = processor.summary();
    info!(
        "[{}] finished: {} frames, {} sales",
        name, summary.total_frames, summary.total_sales
    );
    if let Ok(json) = serde_json::to_string(&summary) {
        info!("[{}] metrics: {}", name, json);
    }
    match read_error {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}
