// src/detection_source.rs
//
// Reads tracker output that was serialized as JSON Lines, one frame per
// line:
//
//   {"frame": 12, "detections": [{"label": "box", "bbox": [x1, y1, x2, y2], "track_id": 7}]}
//
// `frame` is optional and `track_id` may be missing or null.

use crate::types::{Detection, InputConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct FrameInput {
    pub frame_id: u64,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    frame: Option<u64>,
    #[serde(default)]
    detections: Vec<Detection>,
}

/// Frame iterator over a detection log. Malformed lines (bad JSON or not
/// UTF-8) are logged and skipped; only I/O errors are returned.
pub struct DetectionLogReader<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    line_no: u64,
    next_frame_id: u64,
    malformed: u64,
}

impl DetectionLogReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening detection log {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> DetectionLogReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            next_frame_id: 0,
            malformed: 0,
        }
    }

    /// Lines that could not be parsed so far
    pub fn malformed_lines(&self) -> u64 {
        self.malformed
    }
}

impl<R: BufRead> Iterator for DetectionLogReader<R> {
    type Item = Result<FrameInput>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(e) => {
                    self.malformed += 1;
                    warn!("Skipping malformed line {}: {}", self.line_no, e);
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<RawFrame>(line) {
                Ok(raw) => {
                    let frame_id = raw.frame.unwrap_or(self.next_frame_id);
                    self.next_frame_id = frame_id.saturating_add(1);
                    return Some(Ok(FrameInput {
                        frame_id,
                        detections: raw.detections,
                    }));
                }
                Err(e) => {
                    self.malformed += 1;
                    warn!("Skipping malformed line {}: {}", self.line_no, e);
                }
            }
        }
    }
}

/// Detection logs to process. A file path is taken as-is; a directory is
/// walked recursively for files with one of the configured extensions.
pub fn find_detection_logs(config: &InputConfig) -> Result<Vec<PathBuf>> {
    let root = Path::new(&config.path);
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        anyhow::bail!("Input path {} does not exist", root.display());
    }

    let mut logs = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false);
        if matches {
            logs.push(path.to_path_buf());
        }
    }
    logs.sort();

    info!("Found {} detection log(s)", logs.len());
    Ok(logs)
}

/// Name used for the stream's ledger file.
pub fn stream_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stream".to_string())
}
