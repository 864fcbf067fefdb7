//! Process wiring: load configuration, install logging, construct the
//! shared repositories and clients, and drive the orchestrator loop.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use transformat_config::Settings;
use transformat_data::{FileRecordRepository, LockManager, TaskRepository};
use transformat_downstream::{DownstreamClient, DownstreamConfig};
use transformat_telemetry::{LogOutput, LoggingConfig, LoggingGuard, init_logging};

use crate::orchestrator::{DEFAULT_DRAIN_BATCH_SIZE, Orchestrator};
use crate::processor::FileProcessor;

/// Stale `processing` tasks older than this are reset to `pending` at the
/// start of every batch (§4.12).
const STALE_THRESHOLD: Duration = Duration::from_secs(2 * 3600);

/// Everything constructed once at process start and shared across batches.
pub struct BootstrapDependencies {
    settings: Arc<Settings>,
    orchestrator: Orchestrator,
    /// Held for the process lifetime; dropping it stops the logging worker.
    _telemetry: LoggingGuard,
}

impl BootstrapDependencies {
    /// Load configuration, install logging, and construct every shared
    /// service. Sub-services are built once here and reused across every
    /// batch, not re-constructed per task.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing/invalid, logging is
    /// already installed, the database cannot be reached, or the
    /// downstream HTTP client cannot be built.
    pub async fn from_env() -> anyhow::Result<Self> {
        let settings = Settings::from_env()?;

        let log_output = match settings.log_output.as_str() {
            "file" => LogOutput::File,
            _ => LogOutput::Stdout,
        };
        let logging_config = LoggingConfig::new(
            &settings.log_level,
            settings.log_format.as_deref(),
            log_output,
            &settings.log_file_path,
        );
        let telemetry = init_logging(&logging_config)?;

        let pool = PgPoolOptions::new()
            .min_connections(settings.db_pool_min)
            .max_connections(settings.db_pool_max)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(settings.pg_connect_options())
            .await?;

        let task_repo = TaskRepository::new(pool.clone());
        let file_repo = FileRecordRepository::new(pool.clone());
        let lock_manager = LockManager::new(pool.clone());

        let downstream = DownstreamClient::new(DownstreamConfig {
            base_url: settings.downstream_api_base_url.clone(),
            timeout: settings.downstream_api_timeout,
        })?;

        let settings = Arc::new(settings);
        let processor = FileProcessor::new(
            Arc::clone(&settings),
            task_repo.clone(),
            file_repo.clone(),
            downstream,
        );
        let orchestrator = Orchestrator::new(
            task_repo,
            file_repo,
            lock_manager,
            processor,
            DEFAULT_DRAIN_BATCH_SIZE,
            STALE_THRESHOLD,
        );

        Ok(Self {
            settings,
            orchestrator,
            _telemetry: telemetry,
        })
    }
}

/// Run one batch to completion and log the result.
///
/// # Errors
///
/// Returns the first system-category error the batch encounters.
pub async fn run_app() -> anyhow::Result<()> {
    let deps = BootstrapDependencies::from_env().await?;
    run_app_with(deps).await
}

/// Drive a single batch with already-constructed dependencies. Split out
/// from [`run_app`] so tests can supply dependencies without touching the
/// environment.
///
/// # Errors
///
/// Returns the first system-category error the batch encounters.
pub async fn run_app_with(deps: BootstrapDependencies) -> anyhow::Result<()> {
    tracing::info!(env = %deps.settings.env, "starting transformat batch");
    let summary = deps.orchestrator.run_batch().await?;
    tracing::info!(
        completed = summary.completed,
        failed = summary.failed,
        skipped = summary.skipped,
        "batch finished"
    );
    Ok(())
}
