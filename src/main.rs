// src/main.rs

use anyhow::Result;
use pizza_sales_tracker::config::DEFAULT_CONFIG_PATH;
use pizza_sales_tracker::detection_source::find_detection_logs;
use pizza_sales_tracker::pipeline::run_stream;
use pizza_sales_tracker::Config;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SALES_TRACKER_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config_found = Path::new(&config_path).exists();
    let config = Config::load_or_default(&config_path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pizza_sales_tracker={}", config.logging.level))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🍕 Pizza Sales Tracker starting");
    if config_found {
        info!("✓ Configuration loaded from {}", config_path);
    } else {
        warn!("Config {} not found, using defaults", config_path);
    }
    info!(
        "Counting '{}' inside '{}', untracked pairs: {:?}",
        config.labels.content, config.labels.container, config.association.untracked
    );

    let logs = find_detection_logs(&config.input)?;
    if logs.is_empty() {
        error!("No detection logs found in {}", config.input.path);
        return Ok(());
    }

    let mut total_sales = 0;
    for (idx, path) in logs.iter().enumerate() {
        info!(
            "Processing stream {}/{}: {}",
            idx + 1,
            logs.len(),
            path.display()
        );

        match run_stream(path, &config) {
            Ok(summary) => {
                total_sales += summary.total_sales;
                if summary.sink_failures > 0 {
                    warn!(
                        "  ⚠️  {} ledger write failure(s), {} record(s) dropped",
                        summary.sink_failures, summary.records_dropped
                    );
                }
            }
            Err(e) => error!("Failed to process {}: {:#}", path.display(), e),
        }
    }

    info!("✓ {} sale(s) across {} stream(s)", total_sales, logs.len());
    Ok(())
}
