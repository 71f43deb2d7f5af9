// src/ledger_sink.rs
//
// Durable, append-only sale ledgers. The CSV ledger writes its header the
// first time the file is created; every other write is a row append.

use crate::analysis::SaleRecord;
use crate::types::{LedgerConfig, LedgerFormat};
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CSV_HEADER: &str = "Date,Time,Count";

pub trait LedgerSink {
    /// Append one record. Never rewrites or removes earlier rows.
    fn append(&mut self, record: &SaleRecord) -> Result<()>;

    fn path(&self) -> &Path;
}

pub struct CsvLedgerSink {
    path: PathBuf,
}

impl CsvLedgerSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerSink for CsvLedgerSink {
    fn append(&mut self, record: &SaleRecord) -> Result<()> {
        let needs_header = fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let mut file = open_append(&self.path)?;
        if needs_header {
            writeln!(file, "{}", CSV_HEADER)?;
            info!("📒 Created sales ledger {}", self.path.display());
        }
        writeln!(
            file,
            "{},{},{}",
            record.date_string(),
            record.time_string(),
            record.count
        )?;
        file.flush()?;
        debug!("💾 Sale #{} appended to {}", record.count, self.path.display());
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

pub struct JsonlLedgerSink {
    path: PathBuf,
}

impl JsonlLedgerSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerSink for JsonlLedgerSink {
    fn append(&mut self, record: &SaleRecord) -> Result<()> {
        let json_line = serde_json::to_string(&record.to_json())?;
        let mut file = open_append(&self.path)?;
        writeln!(file, "{}", json_line)?;
        file.flush()?;
        debug!("💾 Sale #{} appended to {}", record.count, self.path.display());
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// Open the ledger for a stream: `<output_dir>/<stream_name>.<ext>`.
pub fn open_sink(config: &LedgerConfig, stream_name: &str) -> Result<Box<dyn LedgerSink>> {
    let dir = Path::new(&config.output_dir);
    fs::create_dir_all(dir)
        .with_context(|| format!("creating ledger directory {}", dir.display()))?;

    let path = dir.join(format!("{}.{}", stream_name, config.format.extension()));
    let sink: Box<dyn LedgerSink> = match config.format {
        LedgerFormat::Csv => Box::new(CsvLedgerSink::new(path)),
        LedgerFormat::Jsonl => Box::new(JsonlLedgerSink::new(path)),
    };
    Ok(sink)
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening ledger {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(count: u64, secs: u32) -> SaleRecord {
        SaleRecord {
            recorded_at: NaiveDate::from_ymd_opt(2025, 6, 7)
                .unwrap()
                .and_hms_opt(17, 6, secs)
                .unwrap(),
            count,
            container_id: Some(10),
            content_id: Some(20 + count),
        }
    }

    #[test]
    fn test_csv_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");

        let mut sink = CsvLedgerSink::new(&path);
        sink.append(&record(1, 1)).unwrap();
        sink.append(&record(2, 9)).unwrap();

        // A second sink on the same file keeps appending below the header
        let mut reopened = CsvLedgerSink::new(&path);
        reopened.append(&record(3, 30)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Date,Time,Count",
                "07/06/2025,17:06:01,1",
                "07/06/2025,17:06:09,2",
                "07/06/2025,17:06:30,3",
            ]
        );
    }

    #[test]
    fn test_csv_header_added_to_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        File::create(&path).unwrap();

        CsvLedgerSink::new(&path).append(&record(1, 0)).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Date,Time,Count\n"));
    }

    #[test]
    fn test_jsonl_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");

        let mut sink = JsonlLedgerSink::new(&path);
        sink.append(&record(1, 1)).unwrap();
        sink.append(&record(2, 2)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let rows: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["count"], 2);
        assert_eq!(rows[1]["pizza_id"], 22);
        assert_eq!(rows[0]["time"], "17:06:01");
    }

    #[test]
    fn test_open_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            output_dir: dir.path().join("db").to_string_lossy().into_owned(),
            format: LedgerFormat::Csv,
            max_pending: 8,
        };

        let mut sink = open_sink(&config, "counter_cam").unwrap();
        sink.append(&record(1, 1)).unwrap();
        assert!(dir.path().join("db").join("counter_cam.csv").exists());
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // The ledger path is a directory, so it cannot be opened for append
        let mut sink = CsvLedgerSink::new(dir.path());
        assert!(sink.append(&record(1, 1)).is_err());
    }
}
