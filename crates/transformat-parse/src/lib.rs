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

//! Encoding detection, type conversion, and the fixed-width/delimited
//! record parser for the `transformat` worker.
//!
//! Layout: `encoding.rs` (trial-decode detector), `convert.rs` (scalar type
//! conversion), `record.rs` (the `Record`/`Value` shape), `parser.rs`
//! (line-splitting strategies and the lazy record stream), `model/`
//! (public re-exports).

pub mod convert;
pub mod encoding;
pub mod model;
pub mod parser;
pub mod record;

pub use encoding::decode;
pub use parser::{Strategy, parse_delimited_line, parse_fixed_length_line, parse_stream};
pub use record::{Record, Value};
