mod file_config;

pub use file_config::{FileConfig, HistoryCleanupConfig};

use crate::batch_window::{parse_utc_offset, BatchWindow};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_UTC_OFFSET: &str = "+00:00";
pub const DEFAULT_RETENTION_DAYS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub batch_window_start_time: Option<String>,
    pub batch_window_end_time: Option<String>,
    pub utc_offset: Option<String>,
    pub retention_days: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,

    pub history_cleanup: HistoryCleanupSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryCleanupSettings {
    /// `None` when no window is configured: only immediate triggers work.
    pub window: Option<BatchWindow>,
    pub utc_offset: FixedOffset,
    /// Finished runs older than this are deleted. 0 keeps them forever.
    pub retention_days: u64,
    pub poll_interval_secs: u64,
    pub batch_size: usize,
}

impl Default for HistoryCleanupSettings {
    fn default() -> Self {
        Self {
            window: None,
            utc_offset: Utc.fix(),
            retention_days: DEFAULT_RETENTION_DAYS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let history_cleanup =
            resolve_history_cleanup(cli, file.history_cleanup.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            port,
            logging_level,
            history_cleanup,
        })
    }

    pub fn cleanup_db_path(&self) -> PathBuf {
        self.db_dir.join("cleanup.db")
    }
}

fn resolve_history_cleanup(
    cli: &CliConfig,
    file: HistoryCleanupConfig,
) -> Result<HistoryCleanupSettings> {
    let start = file
        .batch_window_start_time
        .or_else(|| cli.batch_window_start_time.clone());
    let end = file
        .batch_window_end_time
        .or_else(|| cli.batch_window_end_time.clone());

    let window = match (start, end) {
        (Some(start), Some(end)) => Some(
            BatchWindow::parse(&start, &end)
                .with_context(|| format!("Invalid batch window {} - {}", start, end))?,
        ),
        (None, None) => None,
        (Some(_), None) => {
            bail!("batch_window_start_time is set but batch_window_end_time is not")
        }
        (None, Some(_)) => {
            bail!("batch_window_end_time is set but batch_window_start_time is not")
        }
    };

    let utc_offset_text = file
        .utc_offset
        .or_else(|| cli.utc_offset.clone())
        .unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string());
    let utc_offset = parse_utc_offset(&utc_offset_text)?;

    let retention_days = file
        .retention_days
        .or(cli.retention_days)
        .unwrap_or(DEFAULT_RETENTION_DAYS);

    let poll_interval_secs = file
        .poll_interval_secs
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
    if poll_interval_secs == 0 {
        bail!("history_cleanup.poll_interval_secs must be greater than 0");
    }

    let batch_size = file.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
    if batch_size == 0 {
        bail!("history_cleanup.batch_size must be greater than 0");
    }

    Ok(HistoryCleanupSettings {
        window,
        utc_offset,
        retention_days,
        poll_interval_secs,
        batch_size,
    })
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
