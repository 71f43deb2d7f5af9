use serde::{Deserialize, Serialize};

/// Track identifier assigned by the upstream tracker.
pub type TrackId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub labels: LabelsConfig,
    pub association: AssociationConfig,
    pub input: InputConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Class label of the outer object (the open box)
    pub container: String,
    /// Class label of the inner object (the pizza)
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    pub untracked: UntrackedPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// A detection log file, or a directory scanned recursively for logs
    pub path: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub output_dir: String,
    pub format: LedgerFormat,
    /// Records kept for retry while the sink is failing
    pub max_pending: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

/// What to do with a contained pair when the tracker gave no id to one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UntrackedPolicy {
    /// Record the sale; the missing id never enters the association table
    Count,
    /// Never record a sale for a pair with a missing id
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerFormat {
    Csv,
    Jsonl,
}

impl LedgerFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        }
    }
}

/// One labeled, optionally tracked bounding box from the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(alias = "class_label")]
    pub label: String,
    pub bbox: [f32; 4], // [x1, y1, x2, y2] pixels
    #[serde(default)]
    pub track_id: Option<TrackId>,
}

impl Detection {
    pub fn new(label: &str, bbox: [f32; 4], track_id: Option<TrackId>) -> Self {
        Self {
            label: label.to_string(),
            bbox,
            track_id,
        }
    }
}
