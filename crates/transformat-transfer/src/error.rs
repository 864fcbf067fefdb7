//! Errors raised while connecting to, or reading from, the SFTP transfer
//! channel.

use thiserror::Error;

/// Errors produced by this crate, before they are folded into
/// [`transformat_errors::Error`] at the call site.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The remote host rejected the supplied credentials.
    #[error("sftp authentication failed")]
    AuthFailed {
        /// Host the session attempted to authenticate against.
        host: String,
        /// Underlying `ssh2`/IO error.
        source: anyhow::Error,
    },
    /// The transport failed below the SFTP protocol layer (DNS, TCP
    /// connect, handshake, or a background worker panic/timeout).
    #[error("sftp network failure")]
    NetworkError {
        /// Host involved in the failed operation.
        host: String,
        /// Underlying transport error.
        source: anyhow::Error,
    },
    /// The remote path does not exist.
    #[error("remote file not found")]
    FileNotFound {
        /// Path that could not be located.
        path: String,
    },
    /// The remote file was opened but could not be fully read.
    #[error("remote file read failed")]
    ReadFailed {
        /// Path being read.
        path: String,
        /// Underlying `ssh2`/IO error.
        source: anyhow::Error,
    },
}

impl From<TransferError> for transformat_errors::Error {
    fn from(value: TransferError) -> Self {
        match value {
            TransferError::AuthFailed { host, source } => Self::SftpAuthFailed {
                host,
                source: Some(source),
            },
            TransferError::NetworkError { host, source } => Self::SftpNetworkError { host, source },
            TransferError::FileNotFound { path } => Self::FileNotFound { path },
            TransferError::ReadFailed { path, source } => Self::FileReadFailed { path, source },
        }
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, TransferError>;
