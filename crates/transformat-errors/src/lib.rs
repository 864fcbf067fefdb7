#![forbid(unsafe_code)]

//! The closed error-code catalogue shared by every `transformat` crate.
//!
//! Every failure the system raises is one variant of [`Error`]. Each variant
//! carries a constant, non-interpolated message (the `#[error("...")]` text)
//! plus structured fields for the dynamic context; logs and tests key off
//! [`Error::code`], not the rendered string.

use std::fmt;

/// Whether an error aborts the whole batch or only the task that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Infrastructure-level failure. Aborts the current batch.
    System,
    /// Per-file data defect. Fails only the offending task.
    Processing,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Processing => write!(f, "processing"),
        }
    }
}

/// The full catalogue of error codes. Stable identifiers: the variant name
/// is the string label carried into logs and test assertions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// SFTP authentication was rejected by the remote host.
    #[error("transfer authentication failed")]
    SftpAuthFailed {
        /// Host the client attempted to authenticate against.
        host: String,
        /// Underlying transport error, if one was observed.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The SFTP transport failed below the protocol layer.
    #[error("transfer network failure")]
    SftpNetworkError {
        /// Host involved in the failed operation.
        host: String,
        /// Underlying transport error.
        #[source]
        source: anyhow::Error,
    },

    /// Could not obtain a database connection.
    #[error("database connection failed")]
    DbConnectionFailed {
        /// Operation that was attempting to use the connection.
        operation: &'static str,
        /// Non-interpolated diagnostic detail (see `SPEC_FULL.md` §9).
        details: Option<String>,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The connection pool could not hand out a connection before its
    /// acquire timeout elapsed.
    #[error("database pool exhausted")]
    DbPoolExhausted {
        /// Configured maximum pool size at the time of the failure.
        max_connections: u32,
    },

    /// A genuine database failure occurred while acquiring the advisory
    /// lock. Plain contention is never reported through this variant — see
    /// `transformat-data`'s lock manager.
    #[error("advisory lock acquisition failed")]
    AdvisoryLockFailed {
        /// Lock key (`file_record_id`) being acquired.
        file_record_id: i64,
        #[source]
        source: anyhow::Error,
    },

    /// The downstream masking service could not be reached at all, or every
    /// retry attempt failed.
    #[error("downstream connection failed")]
    DownstreamConnectionFailed {
        /// URL that was being called.
        url: String,
        /// Number of attempts made before giving up.
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// The remote file referenced by a task or a status query does not
    /// exist.
    #[error("file not found")]
    FileNotFound {
        /// Path or identifier that could not be located.
        path: String,
    },

    /// The remote file was opened but could not be fully read.
    #[error("file read failed")]
    FileReadFailed {
        /// Path being read.
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// None of the candidate encodings decoded the buffer.
    #[error("encoding detection failed")]
    EncodingDetectionFailed {
        /// Task the buffer belongs to, for log correlation.
        task_id: String,
    },

    /// The buffer could not be decoded using the file record's declared
    /// encoding.
    #[error("encoding mismatch")]
    EncodingMixed {
        /// Encoding that failed to decode the buffer.
        expected: String,
    },

    /// A fixed-width line was shorter than a field's required display span.
    #[error("fixed-width field extraction failed")]
    ParseFixedLengthFailed {
        /// 1-based line number within the input file.
        line_number: usize,
        /// Name of the field being extracted.
        field_name: String,
    },

    /// A delimited line's token count did not match the number of field
    /// definitions.
    #[error("delimiter parse failed")]
    ParseDelimiterFailed {
        /// 1-based line number within the input file.
        line_number: usize,
        /// Number of tokens the split produced.
        found_tokens: usize,
        /// Number of field definitions expected.
        expected_tokens: usize,
    },

    /// A token could not be converted to its declared scalar type.
    #[error("type conversion failed")]
    TypeConversionFailed {
        /// 1-based line number within the input file.
        line_number: usize,
        /// Field whose value failed conversion.
        field_name: String,
        /// Raw token text that failed to convert.
        raw_value: String,
    },

    /// Writing the columnar output failed for a reason other than disk
    /// space.
    #[error("columnar write failed")]
    ColumnarWriteFailed {
        /// Output path being written.
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Writing the columnar output failed because the device ran out of
    /// space or quota.
    #[error("disk space insufficient")]
    DiskSpaceInsufficient {
        /// Output path being written.
        path: String,
    },

    /// The downstream service responded with a non-2xx status.
    #[error("downstream API error")]
    DownstreamApiError {
        /// HTTP status code returned.
        status: u16,
        /// First portion of the response body, for diagnostics.
        body_excerpt: String,
    },

    /// A task row was found in a status that the current operation cannot
    /// act on (e.g. reset-to-pending invoked on a non-`processing` task).
    #[error("task state inconsistent")]
    TaskStateInconsistent {
        /// Task identifier involved.
        task_id: String,
        /// Status actually observed.
        observed_status: String,
    },
}

impl Error {
    /// Semantic category: does this error abort the batch, or only the
    /// task that raised it?
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::SftpAuthFailed { .. }
            | Self::SftpNetworkError { .. }
            | Self::DbConnectionFailed { .. }
            | Self::DbPoolExhausted { .. }
            | Self::AdvisoryLockFailed { .. }
            | Self::DownstreamConnectionFailed { .. } => ErrorCategory::System,

            Self::FileNotFound { .. }
            | Self::FileReadFailed { .. }
            | Self::EncodingDetectionFailed { .. }
            | Self::EncodingMixed { .. }
            | Self::ParseFixedLengthFailed { .. }
            | Self::ParseDelimiterFailed { .. }
            | Self::TypeConversionFailed { .. }
            | Self::ColumnarWriteFailed { .. }
            | Self::DiskSpaceInsufficient { .. }
            | Self::DownstreamApiError { .. }
            | Self::TaskStateInconsistent { .. } => ErrorCategory::Processing,
        }
    }

    /// Whether retrying the same operation might succeed.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        match self {
            Self::SftpAuthFailed { .. }
            | Self::SftpNetworkError { .. }
            | Self::DbConnectionFailed { .. }
            | Self::DbPoolExhausted { .. }
            | Self::DownstreamConnectionFailed { .. } => true,

            Self::AdvisoryLockFailed { .. }
            | Self::FileNotFound { .. }
            | Self::FileReadFailed { .. }
            | Self::EncodingDetectionFailed { .. }
            | Self::EncodingMixed { .. }
            | Self::ParseFixedLengthFailed { .. }
            | Self::ParseDelimiterFailed { .. }
            | Self::TypeConversionFailed { .. }
            | Self::ColumnarWriteFailed { .. }
            | Self::DiskSpaceInsufficient { .. }
            | Self::DownstreamApiError { .. }
            | Self::TaskStateInconsistent { .. } => false,
        }
    }

    /// Stable string label for this error's code, for logs and tests.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SftpAuthFailed { .. } => "SFTP_AUTH_FAILED",
            Self::SftpNetworkError { .. } => "SFTP_NETWORK_ERROR",
            Self::DbConnectionFailed { .. } => "DB_CONNECTION_FAILED",
            Self::DbPoolExhausted { .. } => "DB_POOL_EXHAUSTED",
            Self::AdvisoryLockFailed { .. } => "ADVISORY_LOCK_FAILED",
            Self::DownstreamConnectionFailed { .. } => "DOWNSTREAM_CONNECTION_FAILED",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::FileReadFailed { .. } => "FILE_READ_FAILED",
            Self::EncodingDetectionFailed { .. } => "ENCODING_DETECTION_FAILED",
            Self::EncodingMixed { .. } => "ENCODING_MIXED",
            Self::ParseFixedLengthFailed { .. } => "PARSE_FIXED_LENGTH_FAILED",
            Self::ParseDelimiterFailed { .. } => "PARSE_DELIMITER_FAILED",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::ColumnarWriteFailed { .. } => "PARQUET_WRITE_FAILED",
            Self::DiskSpaceInsufficient { .. } => "PARQUET_DISK_SPACE_INSUFFICIENT",
            Self::DownstreamApiError { .. } => "DOWNSTREAM_API_ERROR",
            Self::TaskStateInconsistent { .. } => "TASK_STATE_INCONSISTENT",
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_errors_abort_the_batch() {
        let err = Error::DbConnectionFailed {
            operation: "acquire",
            details: Some("pool closed".to_string()),
            source: None,
        };
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.code(), "DB_CONNECTION_FAILED");
    }

    #[test]
    fn processing_errors_fail_only_the_task() {
        let err = Error::ParseDelimiterFailed {
            line_number: 4,
            found_tokens: 2,
            expected_tokens: 3,
        };
        assert_eq!(err.category(), ErrorCategory::Processing);
        assert!(!err.retryable());
    }

    #[test]
    fn advisory_lock_failure_is_retryable_only_via_contention_path() {
        let err = Error::AdvisoryLockFailed {
            file_record_id: 42,
            source: anyhow::anyhow!("connection reset"),
        };
        assert_eq!(err.category(), ErrorCategory::System);
        assert!(!err.retryable());
    }
}
