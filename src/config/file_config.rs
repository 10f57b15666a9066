use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,

    pub history_cleanup: Option<HistoryCleanupConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct HistoryCleanupConfig {
    /// Window opening time of day, `HH:mm`.
    pub batch_window_start_time: Option<String>,
    /// Window closing time of day, `HH:mm`. May be earlier than the start.
    pub batch_window_end_time: Option<String>,
    /// Reference zone for the window, e.g. `+02:00`.
    pub utc_offset: Option<String>,
    pub retention_days: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub batch_size: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
