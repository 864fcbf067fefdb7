//! The distributed lock manager: a non-blocking, per-file advisory lock
//! tied to a single database session.

use std::time::Duration;

use sqlx::{PgPool, Postgres, pool::PoolConnection};
use transformat_errors::{Error, Result};

/// Issues [`FileLock`] guards keyed by `file_record_id`.
#[derive(Clone)]
pub struct LockManager {
    pool: PgPool,
}

impl LockManager {
    /// Build a lock manager over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attempt to acquire the advisory lock for `file_record_id`.
    ///
    /// With `timeout` zero, returns immediately: `Ok(None)` means another
    /// session already holds the lock, which is a skip signal, not an
    /// error. With a non-zero `timeout`, blocks up to that long (enforced
    /// by the session's `lock_timeout`) and always returns `Ok(Some(_))` on
    /// success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdvisoryLockFailed`] if the database connection or
    /// the lock statement itself fails; contention alone is never an error.
    pub async fn acquire(&self, file_record_id: i64, timeout: Duration) -> Result<Option<FileLock>> {
        let mut conn = self.pool.acquire().await.map_err(|source| Error::AdvisoryLockFailed {
            file_record_id,
            source: source.into(),
        })?;

        if timeout.is_zero() {
            let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
                .bind(file_record_id)
                .fetch_one(&mut *conn)
                .await
                .map_err(|source| Error::AdvisoryLockFailed {
                    file_record_id,
                    source: source.into(),
                })?;

            if !acquired {
                tracing::debug!(file_record_id, "advisory lock already held by another session");
                return Ok(None);
            }
        } else {
            let timeout_secs = timeout.as_secs();
            sqlx::query(&format!("SET lock_timeout = '{timeout_secs}s'"))
                .execute(&mut *conn)
                .await
                .map_err(|source| Error::AdvisoryLockFailed {
                    file_record_id,
                    source: source.into(),
                })?;

            sqlx::query("SELECT pg_advisory_lock($1)")
                .bind(file_record_id)
                .execute(&mut *conn)
                .await
                .map_err(|source| Error::AdvisoryLockFailed {
                    file_record_id,
                    source: source.into(),
                })?;
        }

        tracing::info!(file_record_id, "acquired advisory lock");
        Ok(Some(FileLock {
            conn: Some(conn),
            file_record_id,
        }))
    }
}

/// RAII guard over a session-scoped advisory lock. The pinned connection is
/// never returned to the pool until [`FileLock::release`] runs, so the
/// unlock statement always travels over the same session that took the
/// lock — using a different connection to unlock is not expressible.
pub struct FileLock {
    conn: Option<PoolConnection<Postgres>>,
    file_record_id: i64,
}

impl FileLock {
    /// Unlock and return the pinned connection to the pool. Idempotent: a
    /// guard with no lock held (already released) logs a warning and
    /// returns `Ok(())` rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdvisoryLockFailed`] if the unlock statement fails.
    pub async fn release(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            tracing::warn!(
                file_record_id = self.file_record_id,
                "attempted to release a lock that is not held"
            );
            return Ok(());
        };

        let released: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
            .bind(self.file_record_id)
            .fetch_one(&mut conn)
            .await
            .map_err(|source| Error::AdvisoryLockFailed {
                file_record_id: self.file_record_id,
                source: source.into(),
            })?;

        if released {
            tracing::info!(file_record_id = self.file_record_id, "released advisory lock");
        } else {
            tracing::warn!(
                file_record_id = self.file_record_id,
                "advisory lock was already released"
            );
        }
        Ok(())
    }

    /// The lock key this guard holds.
    #[must_use]
    pub const fn file_record_id(&self) -> i64 {
        self.file_record_id
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!(
                file_record_id = self.file_record_id,
                "advisory lock guard dropped without an explicit release; detaching connection from the pool"
            );
            conn.detach();
        }
    }
}
