//! Errors raised while building a schema or writing a columnar file.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by this crate, before they are folded into
/// [`transformat_errors::Error`] at the call site.
#[derive(Debug, Error)]
pub enum ColumnarError {
    /// The underlying Arrow/Parquet write failed for a reason other than
    /// disk space.
    #[error("parquet write failure")]
    Write {
        /// Output path being written.
        path: PathBuf,
        /// Underlying error.
        source: parquet::errors::ParquetError,
    },
    /// The device ran out of space or quota while writing.
    #[error("parquet disk space insufficient")]
    DiskSpace {
        /// Output path being written.
        path: PathBuf,
    },
    /// Creating the output directory or file failed before any row was
    /// written.
    #[error("parquet output path failure")]
    Io {
        /// Output path being written.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The record stream itself yielded an error; this crate only forwards
    /// it unchanged rather than reclassifying it as a write failure.
    #[error(transparent)]
    Upstream(#[from] transformat_errors::Error),
}

impl From<ColumnarError> for transformat_errors::Error {
    fn from(value: ColumnarError) -> Self {
        match value {
            ColumnarError::DiskSpace { path } => Self::DiskSpaceInsufficient {
                path: path.display().to_string(),
            },
            ColumnarError::Write { path, source } => Self::ColumnarWriteFailed {
                path: path.display().to_string(),
                source: source.into(),
            },
            ColumnarError::Io { path, source } => Self::ColumnarWriteFailed {
                path: path.display().to_string(),
                source: source.into(),
            },
            ColumnarError::Upstream(source) => source,
        }
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, ColumnarError>;

/// Classify a propagating IO error as disk-space exhaustion or a generic
/// write failure, from its raw OS error code (`ENOSPC`/`EDQUOT`) rather
/// than a message substring match.
#[must_use]
pub fn is_disk_space_exhausted(source: &std::io::Error) -> bool {
    matches!(source.raw_os_error(), Some(libc_code) if is_enospc_or_edquot(libc_code))
}

#[cfg(target_os = "linux")]
fn is_enospc_or_edquot(code: i32) -> bool {
    const ENOSPC: i32 = 28;
    const EDQUOT: i32 = 122;
    code == ENOSPC || code == EDQUOT
}

#[cfg(not(target_os = "linux"))]
fn is_enospc_or_edquot(code: i32) -> bool {
    const ENOSPC: i32 = 28;
    code == ENOSPC
}
