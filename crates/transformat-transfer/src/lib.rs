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

//! Session-scoped SFTP client used to fetch one remote file per task.
//!
//! A session is opened (`SftpSession::connect`), used to read exactly one
//! remote file (`read_file`), and closed (`close`). The blocking `ssh2` API
//! is driven from `tokio::task::spawn_blocking`; the owned [`ssh2::Session`]
//! is moved across that boundary rather than shared, since `ssh2::Sftp`
//! borrows from it and cannot be held across an await point.

pub mod client;
pub mod error;

pub use client::{DEFAULT_TIMEOUT, SftpConfig, SftpSession};
pub use error::TransferError;
