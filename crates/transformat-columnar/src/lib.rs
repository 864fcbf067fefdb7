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

//! The buffered Parquet writer: schema construction from a file's field
//! definitions, batch assembly, and the lazily-opened output file.
//!
//! Layout: `schema.rs` (Arrow schema + `transform_types` metadata),
//! `writer.rs` (the batching writer and output-path conventions), `error.rs`
//! (the crate's error type and its conversion into
//! [`transformat_errors::Error`]).

pub mod error;
pub mod schema;
pub mod writer;

pub use error::ColumnarError;
pub use schema::{TRANSFORM_TYPES_KEY, arrow_type_for, build_schema};
pub use writer::{ColumnarWriter, DEFAULT_BATCH_SIZE, masked_path_for, output_path_for};
