use anyhow::{Context, Result};
use clap::Parser;
use history_cleanup::cleanup::{
    CleanupJobCoordinator, CleanupWorker, ClockProvider, HistoryCleaner, RunHistoryCleaner,
    SystemClock,
};
use history_cleanup::cleanup_store::{JobExecutionStore, JobStore, SqliteCleanupStore};
use history_cleanup::config::{AppConfig, CliConfig, FileConfig};
use history_cleanup::server::{run_server, RequestsLoggingLevel, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the cleanup database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Time of day (HH:mm) at which the cleanup batch window opens.
    #[clap(long)]
    pub batch_window_start_time: Option<String>,

    /// Time of day (HH:mm) at which the cleanup batch window closes.
    #[clap(long)]
    pub batch_window_end_time: Option<String>,

    /// Reference UTC offset for the batch window, e.g. +02:00.
    #[clap(long)]
    pub utc_offset: Option<String>,

    /// Days of cleanup run history to keep. Set to 0 to keep it forever.
    #[clap(long)]
    pub retention_days: Option<u64>,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            batch_window_start_time: args.batch_window_start_time.clone(),
            batch_window_end_time: args.batch_window_end_time.clone(),
            utc_offset: args.utc_offset.clone(),
            retention_days: args.retention_days,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;
    let cleanup_settings = &config.history_cleanup;

    match &cleanup_settings.window {
        Some(window) => info!(
            "Cleanup batch window {} - {} (UTC offset {})",
            window.start(),
            window.end(),
            cleanup_settings.utc_offset
        ),
        None => info!("No cleanup batch window configured, only immediate cleanups will run"),
    }

    let cleanup_db_path = config.cleanup_db_path();
    info!("Opening cleanup database at {:?}...", cleanup_db_path);
    let store = Arc::new(SqliteCleanupStore::new(&cleanup_db_path)?);
    let job_store: Arc<dyn JobStore> = store.clone();
    let job_execution_store: Arc<dyn JobExecutionStore> = store;
    let clock: Arc<dyn ClockProvider> = Arc::new(SystemClock);

    let coordinator = CleanupJobCoordinator::new(
        job_store,
        clock.clone(),
        cleanup_settings.window,
        cleanup_settings.utc_offset,
    );

    let shutdown_token = CancellationToken::new();

    let cleaner: Arc<dyn HistoryCleaner> = Arc::new(RunHistoryCleaner::new(
        job_execution_store.clone(),
        cleanup_settings.retention_days,
    ));
    let worker = CleanupWorker::new(
        job_execution_store.clone(),
        cleaner,
        clock,
        Duration::from_secs(cleanup_settings.poll_interval_secs),
        cleanup_settings.batch_size,
        shutdown_token.clone(),
    )
    .with_batch_window(cleanup_settings.window, cleanup_settings.utc_offset);
    let worker_handle = tokio::spawn(worker.run());

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
    };
    let result = run_server(
        server_config,
        coordinator,
        job_execution_store,
        shutdown_token.clone(),
    )
    .await;

    shutdown_token.cancel();
    if let Err(e) = worker_handle.await {
        error!("Cleanup worker task failed: {}", e);
    }
    info!("Shutdown complete");

    result
}
