//! The file-record repository: insert-or-return file metadata and
//! per-field schema lookup.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use transformat_errors::{Error, Result};

use crate::support::db_error;

/// Text encoding a file record declares for its raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8.
    Utf8,
    /// Big5 (Traditional Chinese).
    Big5,
}

impl Encoding {
    const fn as_db_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Big5 => "big5",
        }
    }

    fn parse(raw: &str, file_name: &str) -> Result<Self> {
        match raw {
            "utf-8" => Ok(Self::Utf8),
            "big5" => Ok(Self::Big5),
            other => Err(Error::FileReadFailed {
                path: file_name.to_string(),
                source: anyhow::anyhow!("unsupported encoding `{other}`"),
            }),
        }
    }
}

/// Line layout a file record declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Lines split on an explicit delimiter string.
    Delimited,
    /// Lines split by fixed display-column spans.
    FixedLength,
}

impl FormatType {
    const fn as_db_str(self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::FixedLength => "fixed_length",
        }
    }

    fn parse(raw: &str, file_name: &str) -> Result<Self> {
        match raw {
            "delimited" => Ok(Self::Delimited),
            "fixed_length" => Ok(Self::FixedLength),
            other => Err(Error::FileReadFailed {
                path: file_name.to_string(),
                source: anyhow::anyhow!("unsupported format_type `{other}`"),
            }),
        }
    }
}

/// Immutable descriptor of a known input file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Surrogate primary key.
    pub id: i64,
    /// Unique name identifying the file across runs.
    pub file_name: String,
    /// Free-text origin label.
    pub source: Option<String>,
    /// Declared byte encoding.
    pub encoding: Encoding,
    /// Declared line layout.
    pub format_type: FormatType,
    /// Required when `format_type` is [`FormatType::Delimited`].
    pub delimiter: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row last-modified time, if ever updated out of band.
    pub updated_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    fn from_row(row: PgRow) -> Result<Self> {
        let file_name: String = row.try_get("file_name").map_err(|source| db_error("file_records", source))?;
        let encoding: String = row.try_get("encoding").map_err(|source| db_error("file_records", source))?;
        let format_type: String =
            row.try_get("format_type").map_err(|source| db_error("file_records", source))?;
        Ok(Self {
            id: row.try_get("id").map_err(|source| db_error("file_records", source))?,
            encoding: Encoding::parse(&encoding, &file_name)?,
            format_type: FormatType::parse(&format_type, &file_name)?,
            source: row.try_get("source").map_err(|source| db_error("file_records", source))?,
            delimiter: row
                .try_get("delimiter")
                .map_err(|source| db_error("file_records", source))?,
            created_at: row
                .try_get("created_at")
                .map_err(|source| db_error("file_records", source))?,
            updated_at: row
                .try_get("updated_at")
                .map_err(|source| db_error("file_records", source))?,
            file_name,
        })
    }
}

/// Typed scalar a field definition parses its token into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Kept verbatim.
    String,
    /// Parsed as a 64-bit signed integer.
    Int,
    /// Parsed as a 64-bit float.
    Double,
    /// Parsed against a fixed set of timestamp formats.
    Timestamp,
}

impl FieldType {
    fn parse(raw: &str) -> Self {
        match raw {
            "int" => Self::Int,
            "double" => Self::Double,
            "timestamp" => Self::Timestamp,
            _ => Self::String,
        }
    }
}

/// Per-column masking policy a downstream consumer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformType {
    /// No transformation; value passes through unchanged.
    #[default]
    Plain,
    /// Value is masked by the downstream service.
    Mask,
    /// Value is encrypted by the downstream service.
    Encrypt,
}

impl TransformType {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("mask") => Self::Mask,
            Some("encrypt") => Self::Encrypt,
            _ => Self::Plain,
        }
    }
}

/// Per-file, per-field schema entry.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Surrogate primary key.
    pub id: i64,
    /// File this definition belongs to.
    pub file_name: String,
    /// Column name in the columnar output.
    pub field_name: String,
    /// 1-based ordinal within the file's schema.
    pub sequence: i32,
    /// Target scalar type.
    pub field_type: FieldType,
    /// Fixed-width start column (display columns, 1-based). Unused for
    /// delimited files.
    pub start_position: i32,
    /// Fixed-width span (display columns). Unused for delimited files.
    pub field_length: i32,
    /// Downstream masking policy.
    pub transform_type: TransformType,
}

impl FieldDefinition {
    fn from_row(row: PgRow) -> sqlx::Result<Self> {
        let field_type: String = row.try_get("field_type")?;
        let transform_type: Option<String> = row.try_get("transform_type")?;
        Ok(Self {
            id: row.try_get("id")?,
            file_name: row.try_get("file_name")?,
            field_name: row.try_get("field_name")?,
            sequence: row.try_get("sequence")?,
            field_type: FieldType::parse(&field_type),
            start_position: row.try_get("start_position")?,
            field_length: row.try_get("field_length")?,
            transform_type: TransformType::parse(transform_type.as_deref()),
        })
    }
}

const FILE_RECORD_COLUMNS: &str =
    "id, file_name, source, encoding, format_type, delimiter, created_at, updated_at";

const FIELD_DEFINITION_COLUMNS: &str =
    "id, file_name, field_name, sequence, field_type, start_position, field_length, transform_type";

const FIELD_DEFINITION_COLUMNS_BY_FILE_ID: &str = "fd.id, fd.file_name, fd.field_name, \
    fd.sequence, fd.field_type, fd.start_position, fd.field_length, fd.transform_type";

/// Database-backed repository for [`FileRecord`] and [`FieldDefinition`] rows.
#[derive(Clone)]
pub struct FileRecordRepository {
    pool: PgPool,
}

impl FileRecordRepository {
    /// Build a repository over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a file record, or return the existing row if `file_name` is
    /// already registered. Validates `encoding`, `format_type`, and the
    /// delimited/delimiter invariant before touching the database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileReadFailed`] if validation fails, or
    /// [`Error::DbConnectionFailed`] if the database operation fails.
    pub async fn insert_file_record(
        &self,
        file_name: &str,
        source: Option<&str>,
        encoding: Encoding,
        format_type: FormatType,
        delimiter: Option<&str>,
    ) -> Result<FileRecord> {
        if format_type == FormatType::Delimited && delimiter.is_none() {
            return Err(Error::FileReadFailed {
                path: file_name.to_string(),
                source: anyhow::anyhow!("delimited format requires a delimiter"),
            });
        }

        let sql = format!(
            "INSERT INTO file_records (file_name, source, encoding, format_type, delimiter) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (file_name) DO NOTHING \
             RETURNING {FILE_RECORD_COLUMNS}"
        );
        let inserted = sqlx::query(&sql)
            .bind(file_name)
            .bind(source)
            .bind(encoding.as_db_str())
            .bind(format_type.as_db_str())
            .bind(delimiter)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| db_error("insert_file_record", source))?;

        let row = match inserted {
            Some(row) => {
                tracing::info!(file_name, "file record inserted");
                row
            }
            None => {
                let existing_sql =
                    format!("SELECT {FILE_RECORD_COLUMNS} FROM file_records WHERE file_name = $1");
                sqlx::query(&existing_sql)
                    .bind(file_name)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|source| db_error("insert_file_record", source))?
            }
        };

        FileRecord::from_row(row)
    }

    /// Fetch a file record by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the query fails.
    pub async fn get_file_record_by_name(&self, file_name: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_RECORD_COLUMNS} FROM file_records WHERE file_name = $1");
        let row = sqlx::query(&sql)
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| db_error("get_file_record_by_name", source))?;

        row.map(FileRecord::from_row).transpose()
    }

    /// Fetch a file record by surrogate id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the query fails.
    pub async fn get_by_id(&self, file_record_id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_RECORD_COLUMNS} FROM file_records WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(file_record_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| db_error("get_by_id", source))?;

        row.map(FileRecord::from_row).transpose()
    }

    /// Files with no completed task, oldest first. Diagnostic only: used for
    /// an orchestrator startup log line, never on the task-claiming path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the query fails.
    pub async fn list_pending_files(&self, limit: i64) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT fr.id, fr.file_name, fr.source, fr.encoding, fr.format_type, fr.delimiter, \
             fr.created_at, fr.updated_at \
             FROM file_records fr \
             LEFT JOIN file_tasks ft ON fr.id = ft.file_record_id AND ft.status = 'completed' \
             WHERE ft.id IS NULL \
             ORDER BY fr.created_at ASC LIMIT $1"
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| db_error("list_pending_files", source))?;

        rows.into_iter().map(FileRecord::from_row).collect()
    }

    /// Field definitions for a file, ordered by `sequence`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the query fails.
    pub async fn get_field_definitions_by_file_name(
        &self,
        file_name: &str,
    ) -> Result<Vec<FieldDefinition>> {
        let sql = format!(
            "SELECT {FIELD_DEFINITION_COLUMNS} FROM field_definitions \
             WHERE file_name = $1 ORDER BY sequence ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(file_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| db_error("get_field_definitions_by_file_name", source))?;

        rows.into_iter()
            .map(FieldDefinition::from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(|source| db_error("get_field_definitions_by_file_name", source))
    }

    /// Field definitions for a file, resolved from its surrogate id via a
    /// single join (file id → file_name → definitions).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DbConnectionFailed`] if the query fails.
    pub async fn get_field_definitions_by_file_id(
        &self,
        file_record_id: i64,
    ) -> Result<Vec<FieldDefinition>> {
        let sql = format!(
            "SELECT {FIELD_DEFINITION_COLUMNS_BY_FILE_ID} \
             FROM field_definitions fd \
             JOIN file_records fr ON fr.file_name = fd.file_name \
             WHERE fr.id = $1 ORDER BY fd.sequence ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(file_record_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| db_error("get_field_definitions_by_file_id", source))?;

        rows.into_iter()
            .map(FieldDefinition::from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(|source| db_error("get_field_definitions_by_file_id", source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_rejects_unknown_values() {
        assert!(Encoding::parse("gbk", "sample.txt").is_err());
        assert_eq!(Encoding::parse("utf-8", "sample.txt").unwrap(), Encoding::Utf8);
    }

    #[test]
    fn format_type_rejects_unknown_values() {
        assert!(FormatType::parse("csv", "sample.txt").is_err());
        assert_eq!(
            FormatType::parse("fixed_length", "sample.txt").unwrap(),
            FormatType::FixedLength
        );
    }

    #[test]
    fn transform_type_defaults_to_plain() {
        assert_eq!(TransformType::parse(None), TransformType::Plain);
        assert_eq!(TransformType::parse(Some("mask")), TransformType::Mask);
        assert_eq!(TransformType::parse(Some("unknown")), TransformType::Plain);
    }
}
