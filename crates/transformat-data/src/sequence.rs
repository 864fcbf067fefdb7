//! Atomic per-day allocation of `transformat_YYYYMMDDNNNN` task ids.

use chrono::NaiveDate;
use sqlx::PgPool;
use transformat_errors::Result;

use crate::support::db_error;

fn format_task_id(date: NaiveDate, value: i32) -> String {
    format!("transformat_{}{value:04}", date.format("%Y%m%d"))
}

/// Allocates unique `task_id` values for a given calendar date.
#[derive(Clone)]
pub struct SequenceGenerator {
    pool: PgPool,
}

impl SequenceGenerator {
    /// Build a sequence generator over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Allocate the next task id for `task_date` (today, if absent).
    ///
    /// The allocation is atomic across concurrent workers: the per-date
    /// counter row is locked with `SELECT ... FOR UPDATE` inside one
    /// transaction, incremented (or inserted at `1` if the date has no row
    /// yet), and committed before the formatted id is returned. Sequences
    /// reset at date boundaries and never wrap around; the 4-digit padding
    /// is cosmetic only, values beyond `9999` are not truncated.
    ///
    /// # Errors
    ///
    /// Returns [`transformat_errors::Error::DbConnectionFailed`] if any
    /// step of the transaction fails.
    pub async fn generate_task_id(&self, task_date: Option<NaiveDate>) -> Result<String> {
        let task_date = task_date.unwrap_or_else(|| chrono::Utc::now().date_naive());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| db_error("generate_task_id", source))?;

        let current: Option<i32> = sqlx::query_scalar(
            "SELECT current_value FROM task_sequences WHERE sequence_date = $1 FOR UPDATE",
        )
        .bind(task_date)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|source| db_error("generate_task_id", source))?;

        let next_value = match current {
            Some(value) => {
                sqlx::query("UPDATE task_sequences SET current_value = $1 WHERE sequence_date = $2")
                    .bind(value + 1)
                    .bind(task_date)
                    .execute(&mut *tx)
                    .await
                    .map_err(|source| db_error("generate_task_id", source))?;
                value + 1
            }
            None => {
                sqlx::query(
                    "INSERT INTO task_sequences (sequence_date, current_value) VALUES ($1, 1)",
                )
                .bind(task_date)
                .execute(&mut *tx)
                .await
                .map_err(|source| db_error("generate_task_id", source))?;
                1
            }
        };

        tx.commit()
            .await
            .map_err(|source| db_error("generate_task_id", source))?;

        let task_id = format_task_id(task_date, next_value);
        tracing::info!(task_id, sequence_date = %task_date, next_value, "task id allocated");
        Ok(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_small_serials_to_four_digits() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        assert_eq!(format_task_id(date, 7), "transformat_202607300007");
    }

    #[test]
    fn serials_past_nine_thousand_are_not_truncated() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        assert_eq!(
            format_task_id(date, 12_345),
            format!("transformat_20260730{}", 12_345)
        );
    }
}
