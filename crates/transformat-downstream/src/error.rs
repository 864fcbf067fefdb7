//! Errors raised while talking to the downstream masking service.

use thiserror::Error;

/// Errors produced by this crate, before they are folded into
/// [`transformat_errors::Error`] at the call site.
#[derive(Debug, Error)]
pub enum DownstreamError {
    /// Every retry attempt failed below the HTTP layer (connect, TLS,
    /// timeout) or the connection was refused outright.
    #[error("downstream connection failed")]
    ConnectionFailed {
        /// URL that was being called.
        url: String,
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Underlying transport error from the last attempt.
        source: anyhow::Error,
    },
    /// The service responded, but with a non-2xx status.
    #[error("downstream API error")]
    ApiError {
        /// HTTP status code returned.
        status: u16,
        /// First portion of the response body, for diagnostics.
        body_excerpt: String,
    },
    /// A status query targeted a task id the service has no record of.
    #[error("downstream task not found")]
    NotFound {
        /// Task id that produced the 404.
        task_id: String,
    },
}

impl From<DownstreamError> for transformat_errors::Error {
    fn from(value: DownstreamError) -> Self {
        match value {
            DownstreamError::ConnectionFailed { url, attempts, source } => {
                Self::DownstreamConnectionFailed { url, attempts, source }
            }
            DownstreamError::ApiError { status, body_excerpt } => {
                Self::DownstreamApiError { status, body_excerpt }
            }
            DownstreamError::NotFound { task_id } => Self::FileNotFound { path: task_id },
        }
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, DownstreamError>;
