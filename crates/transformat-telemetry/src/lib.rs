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

//! Structured logging for the `transformat` worker.
//!
//! Layout: `init.rs` (subscriber setup, stdout or file).

pub mod init;

pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LogOutput, LoggingConfig, LoggingGuard, Result as TelemetryResult,
    TelemetryError, init_logging,
};
