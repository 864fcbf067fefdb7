//! Session-scoped SFTP client: connect, read-whole-file, close.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TransferError};

/// Default connect/read timeout used when a caller does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters for one SFTP session.
#[derive(Debug, Clone)]
pub struct SftpConfig {
    /// Remote host.
    pub host: String,
    /// Remote port.
    pub port: u16,
    /// Authentication username.
    pub username: String,
    /// Authentication password.
    pub password: String,
    /// Connect/read timeout.
    pub timeout: Duration,
}

/// A single, session-scoped SFTP connection.
///
/// Opened on entry (authenticate, then the session is ready to bind an SFTP
/// subsystem per call), closed on exit. Not shared across tasks: one
/// instance is created, used for exactly one file, and closed.
pub struct SftpSession {
    host: String,
    timeout: Duration,
    inner: Option<ssh2::Session>,
}

impl SftpSession {
    /// Authenticate and open a session against `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::AuthFailed`] if the credentials are
    /// rejected, or [`TransferError::NetworkError`] for any failure below
    /// the protocol layer (DNS, TCP connect, handshake, or a timeout).
    pub async fn connect(config: SftpConfig) -> Result<Self> {
        let host = config.host.clone();
        let connect_host = config.host.clone();
        let timeout = config.timeout;
        let task = tokio::task::spawn_blocking(move || connect_blocking(&config));

        let session = tokio::time::timeout(timeout, task)
            .await
            .map_err(|_| TransferError::NetworkError {
                host: connect_host.clone(),
                source: anyhow::anyhow!("connect timed out"),
            })?
            .map_err(|source| TransferError::NetworkError {
                host: connect_host,
                source: anyhow::anyhow!(source),
            })??;

        tracing::info!(host = %host, "sftp session established");
        Ok(Self {
            host,
            timeout,
            inner: Some(session),
        })
    }

    /// Read the entire contents of `remote_path` into memory.
    ///
    /// The design assumes batch-sized files, not multi-gigabyte streams, so
    /// the whole file is buffered rather than streamed.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::FileNotFound`] if `remote_path` does not
    /// exist, or [`TransferError::ReadFailed`] if it exists but cannot be
    /// fully read.
    pub async fn read_file(&mut self, remote_path: &str, task_id: &str) -> Result<Vec<u8>> {
        let session = self.inner.take().ok_or_else(|| TransferError::NetworkError {
            host: self.host.clone(),
            source: anyhow::anyhow!("session already closed"),
        })?;
        let path = remote_path.to_string();

        let task = tokio::task::spawn_blocking(move || {
            let outcome = read_blocking(&session, &path);
            (session, outcome)
        });

        let (session, outcome) = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| TransferError::ReadFailed {
                path: remote_path.to_string(),
                source: anyhow::anyhow!("read timed out"),
            })?
            .map_err(|source| TransferError::ReadFailed {
                path: remote_path.to_string(),
                source: anyhow::anyhow!(source),
            })?;

        self.inner = Some(session);

        match &outcome {
            Ok(bytes) => {
                tracing::info!(task_id, path = remote_path, size = bytes.len(), "remote file read");
            }
            Err(err) => {
                tracing::error!(task_id, path = remote_path, error = %err, "remote file read failed");
            }
        }
        outcome
    }

    /// Close the transport and the SFTP channel. Idempotent: closing an
    /// already-closed session is a no-op.
    pub async fn close(mut self) {
        let Some(session) = self.inner.take() else {
            return;
        };
        let host = self.host.clone();
        let _ = tokio::task::spawn_blocking(move || session.disconnect(None, "task complete", None)).await;
        tracing::info!(host = %host, "sftp session closed");
    }
}

fn connect_blocking(config: &SftpConfig) -> Result<ssh2::Session> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port)).map_err(|source| {
        TransferError::NetworkError {
            host: config.host.clone(),
            source: source.into(),
        }
    })?;
    tcp.set_read_timeout(Some(config.timeout)).ok();
    tcp.set_write_timeout(Some(config.timeout)).ok();

    let mut session = ssh2::Session::new().map_err(|source| TransferError::NetworkError {
        host: config.host.clone(),
        source: source.into(),
    })?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|source| TransferError::NetworkError {
        host: config.host.clone(),
        source: source.into(),
    })?;

    session
        .userauth_password(&config.username, &config.password)
        .map_err(|source| TransferError::AuthFailed {
            host: config.host.clone(),
            source: source.into(),
        })?;

    if !session.authenticated() {
        return Err(TransferError::AuthFailed {
            host: config.host.clone(),
            source: anyhow::anyhow!("authentication did not complete"),
        });
    }

    Ok(session)
}

fn read_blocking(session: &ssh2::Session, remote_path: &str) -> Result<Vec<u8>> {
    let sftp = session.sftp().map_err(|source| TransferError::ReadFailed {
        path: remote_path.to_string(),
        source: source.into(),
    })?;

    let path = Path::new(remote_path);
    sftp.stat(path).map_err(|_| TransferError::FileNotFound {
        path: remote_path.to_string(),
    })?;

    let mut file = sftp.open(path).map_err(|source| TransferError::ReadFailed {
        path: remote_path.to_string(),
        source: source.into(),
    })?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|source| TransferError::ReadFailed {
            path: remote_path.to_string(),
            source: source.into(),
        })?;

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_matches_spec_default() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(30));
    }
}
