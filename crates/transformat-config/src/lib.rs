#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Environment-variable configuration loader.
//!
//! Settings are read from the process environment with `.env`-file values
//! loaded first as a fallback: `dotenvy::dotenv()` never overwrites a
//! variable that is already set, so real environment values always win.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable was not set and has no default.
    #[error("missing required environment variable")]
    MissingVar {
        /// Name of the missing variable.
        name: &'static str,
    },
    /// An environment variable was set but could not be parsed.
    #[error("invalid environment variable value")]
    InvalidVar {
        /// Name of the offending variable.
        name: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fully resolved runtime configuration for one worker process.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Deployment environment label (`development`, `production`, ...).
    pub env: String,

    /// Database host.
    pub db_host: String,
    /// Database port.
    pub db_port: u16,
    /// Database name.
    pub db_name: String,
    /// Database user.
    pub db_user: String,
    /// Database password.
    pub db_password: String,
    /// Minimum pool size.
    pub db_pool_min: u32,
    /// Maximum pool size.
    pub db_pool_max: u32,

    /// SFTP host.
    pub sftp_host: String,
    /// SFTP port.
    pub sftp_port: u16,
    /// SFTP user.
    pub sftp_user: String,
    /// SFTP password.
    pub sftp_password: String,

    /// Directory remote input files are resolved relative to.
    pub input_dir: String,
    /// Directory columnar output files are written to.
    pub output_dir: PathBuf,
    /// Directory masked columnar output paths are reported under.
    pub masked_dir: PathBuf,

    /// Base URL of the downstream masking service.
    pub downstream_api_base_url: String,
    /// Per-request timeout for the downstream client.
    pub downstream_api_timeout: Duration,

    /// Minimum tracing level.
    pub log_level: String,
    /// Log rendering format (`json` or `pretty`).
    pub log_format: Option<String>,
    /// Log output target (`stdout` or `file`).
    pub log_output: String,
    /// File path used when `log_output = file`.
    pub log_file_path: PathBuf,

    /// Row count per columnar batch.
    pub stream_batch_size: usize,
}

impl Settings {
    /// Load settings from the process environment, loading a `.env` file
    /// first as a non-fatal fallback for any variable not already set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is absent or a numeric
    /// variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            env: env_or("ENV", "development"),

            db_host: env_or("DB_HOST", "localhost"),
            db_port: parse_or("DB_PORT", 5432)?,
            db_name: required("DB_NAME")?,
            db_user: required("DB_USER")?,
            db_password: required("DB_PASSWORD")?,
            db_pool_min: parse_or("DB_POOL_MIN", 5)?,
            db_pool_max: parse_or("DB_POOL_MAX", 15)?,

            sftp_host: required("SFTP_HOST")?,
            sftp_port: parse_or("SFTP_PORT", 22)?,
            sftp_user: required("SFTP_USER")?,
            sftp_password: required("SFTP_PASSWORD")?,

            input_dir: env_or("INPUT_DIR", "."),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "./output")),
            masked_dir: PathBuf::from(env_or("MASKED_DIR", "./masked")),

            downstream_api_base_url: required("DOWNSTREAM_API_BASE_URL")?,
            downstream_api_timeout: Duration::from_secs(parse_or("DOWNSTREAM_API_TIMEOUT", 300)?),

            log_level: env_or("LOG_LEVEL", "info"),
            log_format: env::var("LOG_FORMAT").ok(),
            log_output: env_or("LOG_OUTPUT", "stdout"),
            log_file_path: PathBuf::from(env_or("LOG_FILE_PATH", "./logs/transformat.log")),

            stream_batch_size: parse_or("STREAM_BATCH_SIZE", 30_000)?,
        })
    }

    /// Postgres connection options built from the discrete `db_*` fields.
    ///
    /// Built through [`sqlx::postgres::PgConnectOptions`]'s setters rather
    /// than interpolating a `postgres://` string, so a user or password
    /// containing a URL-reserved character (`@`, `:`, `/`) is passed through
    /// intact instead of corrupting the connection string.
    #[must_use]
    pub fn pg_connect_options(&self) -> sqlx::postgres::PgConnectOptions {
        sqlx::postgres::PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .password(&self.db_password)
            .database(&self.db_name)
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &'static str) -> Result<String> {
    env::var(name).map_err(|_| ConfigError::MissingVar { name })
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
            name,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_transformat_vars() {
        for key in [
            "ENV",
            "DB_HOST",
            "DB_PORT",
            "DB_NAME",
            "DB_USER",
            "DB_PASSWORD",
            "SFTP_HOST",
            "SFTP_PORT",
            "SFTP_USER",
            "SFTP_PASSWORD",
            "DOWNSTREAM_API_BASE_URL",
            "DOWNSTREAM_API_TIMEOUT",
            "STREAM_BATCH_SIZE",
        ] {
            // SAFETY: tests run single-threaded under ENV_LOCK.
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn missing_required_var_is_reported_by_name() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_transformat_vars();
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar { name: "DB_NAME" }));
    }

    #[test]
    fn numeric_defaults_match_spec() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_transformat_vars();
        // SAFETY: tests run single-threaded under ENV_LOCK.
        unsafe {
            env::set_var("DB_NAME", "bank");
            env::set_var("DB_USER", "svc");
            env::set_var("DB_PASSWORD", "secret");
            env::set_var("SFTP_HOST", "sftp.example.com");
            env::set_var("SFTP_USER", "svc");
            env::set_var("SFTP_PASSWORD", "secret");
            env::set_var("DOWNSTREAM_API_BASE_URL", "https://mask.example.com");
        }

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.db_pool_min, 5);
        assert_eq!(settings.db_pool_max, 15);
        assert_eq!(settings.downstream_api_timeout, Duration::from_secs(300));
        assert_eq!(settings.stream_batch_size, 30_000);
    }
}
