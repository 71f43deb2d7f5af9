// src/config.rs

use crate::types::{
    AssociationConfig, Config, InputConfig, LabelsConfig, LedgerConfig, LedgerFormat,
    LoggingConfig, UntrackedPolicy,
};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let container = self.labels.container.trim();
        let content = self.labels.content.trim();
        if container.is_empty() || content.is_empty() {
            bail!("labels.container and labels.content must be non-empty");
        }
        if container == content {
            bail!(
                "labels.container and labels.content must differ (both are {:?})",
                container
            );
        }
        if self.ledger.max_pending == 0 {
            bail!("ledger.max_pending must be greater than zero");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            labels: LabelsConfig::default(),
            association: AssociationConfig::default(),
            input: InputConfig::default(),
            ledger: LedgerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            container: "box".to_string(),
            content: "pizza".to_string(),
        }
    }
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            untracked: UntrackedPolicy::Count,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "detections".to_string(),
            extensions: vec!["jsonl".to_string(), "ndjson".to_string()],
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            output_dir: "db".to_string(),
            format: LedgerFormat::Csv,
            max_pending: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
