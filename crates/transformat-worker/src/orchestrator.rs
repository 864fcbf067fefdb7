//! Batch orchestrator: stale-task recovery, bounded drain, per-task
//! lock-scoped processing.

use std::time::Duration;

use transformat_data::{FileRecordRepository, LockManager, TaskRepository};
use transformat_errors::{ErrorCategory, Result};

use crate::processor::FileProcessor;

/// Number of pending tasks drained per [`Orchestrator::run_batch`] call.
pub const DEFAULT_DRAIN_BATCH_SIZE: i64 = 10;

/// Outcome counters for one `run_batch` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Tasks that completed successfully.
    pub completed: u32,
    /// Tasks that failed with a processing-category error.
    pub failed: u32,
    /// Tasks skipped because another worker already held the file's lock.
    pub skipped: u32,
}

/// Recovers stale tasks, drains a bounded batch of pending tasks, and
/// scopes each task's processing to its advisory lock.
pub struct Orchestrator {
    task_repo: TaskRepository,
    file_repo: FileRecordRepository,
    lock_manager: LockManager,
    processor: FileProcessor,
    drain_batch_size: i64,
    stale_threshold: Duration,
}

impl Orchestrator {
    /// Build an orchestrator from its shared dependencies.
    #[must_use]
    pub const fn new(
        task_repo: TaskRepository,
        file_repo: FileRecordRepository,
        lock_manager: LockManager,
        processor: FileProcessor,
        drain_batch_size: i64,
        stale_threshold: Duration,
    ) -> Self {
        Self {
            task_repo,
            file_repo,
            lock_manager,
            processor,
            drain_batch_size,
            stale_threshold,
        }
    }

    /// Recover stale `processing` tasks, then drain and process one bounded
    /// batch of pending tasks.
    ///
    /// A system-category error aborts the batch immediately, returning the
    /// error to the caller. A processing-category error fails only the
    /// offending task; the loop continues to the next one.
    ///
    /// # Errors
    ///
    /// Returns the first system-category error encountered.
    pub async fn run_batch(&self) -> Result<BatchSummary> {
        self.recover_stale_tasks().await;
        self.log_pending_file_backlog().await;

        let pending = self.task_repo.get_pending_tasks(self.drain_batch_size).await?;
        tracing::info!(count = pending.len(), "draining pending batch");

        let mut summary = BatchSummary::default();
        for task in pending {
            let lock = match self.lock_manager.acquire(task.file_record_id, Duration::ZERO).await {
                Ok(lock) => lock,
                Err(err) => {
                    tracing::error!(task_id = %task.task_id, error = %err, "lock acquisition failed");
                    return Err(err);
                }
            };

            let Some(lock) = lock else {
                tracing::info!(task_id = %task.task_id, "skipped: file already locked by another worker");
                summary.skipped += 1;
                continue;
            };

            let result = self.processor.process(&task.task_id).await;
            if let Err(err) = lock.release().await {
                tracing::error!(task_id = %task.task_id, error = %err, "failed to release advisory lock");
            }

            match result {
                Ok(()) => summary.completed += 1,
                Err(err) => {
                    summary.failed += 1;
                    let category = err.category();
                    tracing::error!(task_id = %task.task_id, error = %err, code = err.code(), %category, "task failed");
                    if category == ErrorCategory::System {
                        tracing::warn!(task_id = %task.task_id, "system error, breaking batch");
                        return Err(err);
                    }
                }
            }
        }

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch drained"
        );
        Ok(summary)
    }

    async fn recover_stale_tasks(&self) {
        let stale = match self.task_repo.get_stale_processing_tasks(self.stale_threshold).await {
            Ok(stale) => stale,
            Err(err) => {
                tracing::warn!(error = %err, "stale-task recovery query failed, continuing");
                return;
            }
        };
        for task in stale {
            tracing::warn!(task_id = %task.task_id, "resetting stale processing task to pending");
            if let Err(err) = self.task_repo.reset_task_to_pending(&task.task_id).await {
                tracing::warn!(task_id = %task.task_id, error = %err, "failed to reset stale task, continuing");
            }
        }
    }

    async fn log_pending_file_backlog(&self) {
        match self.file_repo.list_pending_files(DEFAULT_DRAIN_BATCH_SIZE).await {
            Ok(files) if !files.is_empty() => {
                tracing::info!(count = files.len(), "files with no completed task on record");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "pending-file backlog query failed, continuing");
            }
        }
    }
}
