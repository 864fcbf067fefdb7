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

//! HTTP client for the downstream masking service: job submission with a
//! bounded retry, and status polling.
//!
//! Layout: `client.rs` (the `reqwest`-backed client and its retry loop),
//! `error.rs` (the crate's error type and its conversion into
//! [`transformat_errors::Error`]).

pub mod client;
pub mod error;

pub use client::{DownstreamClient, DownstreamConfig, FieldConfig, MaskStatus};
pub use error::DownstreamError;
