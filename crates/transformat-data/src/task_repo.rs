//! The task repository: CRUD over `file_tasks` and its status transitions.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use transformat_errors::{Error, Result};

use crate::support::db_error;

/// Default staleness window for `processing` tasks (§4.9).
pub const DEFAULT_STALE_THRESHOLD_HOURS: u64 = 2;

/// Lifecycle status of a [`FileTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Created, not yet claimed by a worker.
    Pending,
    /// Claimed and currently being transformed.
    Processing,
    /// Transformed and delivered successfully.
    Completed,
    /// Failed; `error_message` carries the rendered cause.
    Failed,
}

impl TaskStatus {
    const fn as_db_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn from_db_str(raw: &str) -> Self {
        match raw {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => {
                tracing::warn!(status = other, "unrecognised task status in file_tasks row");
                Self::Failed
            }
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// One execution attempt of transforming a single `FileRecord`.
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Format `transformat_YYYYMMDDNNNN`.
    pub task_id: String,
    /// Foreign key into `file_records`.
    pub file_record_id: i64,
    /// Denormalised copy of the file's name, for cheap log correlation.
    pub file_name: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Set when the task transitions into `processing`.
    pub started_at: Option<DateTime<Utc>>,
    /// Set when the task transitions into `completed` or `failed`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Rendered error message, present only on `failed`.
    pub error_message: Option<String>,
    /// Links a retry task back to the attempt it supersedes.
    pub previous_failed_task_id: Option<String>,
}

impl FileTask {
    fn from_row(row: PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            task_id: row.try_get("task_id")?,
            file_record_id: row.try_get("file_record_id")?,
            file_name: row.try_get("file_name")?,
            status: TaskStatus::from_db_str(&status),
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            error_message: row.try_get("error_message")?,
            previous_failed_task_id: row.try_get("previous_failed_task_id")?,
        })
    }
}

const TASK_COLUMNS: &str = "task_id, file_record_id, file_name, status, started_at, \
    completed_at, error_message, previous_failed_task_id";

/// Database-backed repository for [`FileTask`] rows.
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Build a repository over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new task row in `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the insert fails.
    pub async fn create_task(
        &self,
        task_id: &str,
        file_record_id: i64,
        file_name: &str,
        previous_failed_task_id: Option<&str>,
    ) -> Result<FileTask> {
        let sql = format!(
            "INSERT INTO file_tasks (task_id, file_record_id, file_name, status, previous_failed_task_id) \
             VALUES ($1, $2, $3, 'pending', $4) RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(task_id)
            .bind(file_record_id)
            .bind(file_name)
            .bind(previous_failed_task_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|source| db_error("create_task", source))?;

        let task = FileTask::from_row(row).map_err(|source| db_error("create_task", source))?;
        tracing::info!(task_id = %task.task_id, file_name, "task created");
        Ok(task)
    }

    /// Transition a task's status, applying the timestamp policy from §3 of
    /// the data model: `processing` stamps `started_at`, the terminal
    /// statuses stamp `completed_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if no task exists with `task_id`, or
    /// [`Error::DbConnectionFailed`] if the update fails.
    pub async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        error_message: Option<&str>,
    ) -> Result<FileTask> {
        let sql = match status {
            TaskStatus::Processing => format!(
                "UPDATE file_tasks SET status = $1, started_at = NOW(), error_message = $2 \
                 WHERE task_id = $3 RETURNING {TASK_COLUMNS}"
            ),
            TaskStatus::Completed | TaskStatus::Failed => format!(
                "UPDATE file_tasks SET status = $1, completed_at = NOW(), error_message = $2 \
                 WHERE task_id = $3 RETURNING {TASK_COLUMNS}"
            ),
            TaskStatus::Pending => format!(
                "UPDATE file_tasks SET status = $1, error_message = $2 \
                 WHERE task_id = $3 RETURNING {TASK_COLUMNS}"
            ),
        };

        let row = sqlx::query(&sql)
            .bind(status.as_db_str())
            .bind(error_message)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| db_error("update_status", source))?
            .ok_or_else(|| Error::FileNotFound {
                path: task_id.to_string(),
            })?;

        let task = FileTask::from_row(row).map_err(|source| db_error("update_status", source))?;
        tracing::info!(task_id = %task.task_id, %status, "task status updated");
        Ok(task)
    }

    /// Fetch a task row by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the query fails.
    pub async fn get_task_by_id(&self, task_id: &str) -> Result<Option<FileTask>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM file_tasks WHERE task_id = $1");
        let row = sqlx::query(&sql)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| db_error("get_task_by_id", source))?;

        row.map(FileTask::from_row)
            .transpose()
            .map_err(|source| db_error("get_task_by_id", source))
    }

    /// Pending tasks ordered by `task_id` ascending, bounded by `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the query fails.
    pub async fn get_pending_tasks(&self, limit: i64) -> Result<Vec<FileTask>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM file_tasks WHERE status = 'pending' \
             ORDER BY task_id ASC LIMIT $1"
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| db_error("get_pending_tasks", source))?;

        rows.into_iter()
            .map(FileTask::from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(|source| db_error("get_pending_tasks", source))
    }

    /// Tasks stuck in `processing` for longer than `stale_after`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the query fails.
    pub async fn get_stale_processing_tasks(&self, stale_after: Duration) -> Result<Vec<FileTask>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM file_tasks WHERE status = 'processing' \
             AND started_at < NOW() - make_interval(secs => $1) ORDER BY started_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(stale_after.as_secs_f64())
            .fetch_all(&self.pool)
            .await
            .map_err(|source| db_error("get_stale_processing_tasks", source))?;

        rows.into_iter()
            .map(FileTask::from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(|source| db_error("get_stale_processing_tasks", source))
    }

    /// Reset a task to `pending`, clearing timestamps and the error message.
    /// Used by the orchestrator's recovery step to reclaim stale tasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if no task exists with `task_id`, or
    /// [`Error::DbConnectionFailed`] if the update fails.
    pub async fn reset_task_to_pending(&self, task_id: &str) -> Result<FileTask> {
        let sql = format!(
            "UPDATE file_tasks SET status = 'pending', started_at = NULL, completed_at = NULL, \
             error_message = NULL WHERE task_id = $1 RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| db_error("reset_task_to_pending", source))?
            .ok_or_else(|| Error::FileNotFound {
                path: task_id.to_string(),
            })?;

        let task =
            FileTask::from_row(row).map_err(|source| db_error("reset_task_to_pending", source))?;
        tracing::info!(task_id = %task.task_id, "task reset to pending");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::from_db_str(status.as_db_str()), status);
        }
    }

    #[test]
    fn unknown_status_string_falls_back_to_failed() {
        assert_eq!(TaskStatus::from_db_str("archived"), TaskStatus::Failed);
    }
}
