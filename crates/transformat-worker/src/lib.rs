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

//! Batch orchestrator, file processor, and process bootstrap for the
//! `transformat` worker.
//!
//! Layout: `bootstrap.rs` (env-driven wiring and the process entrypoint),
//! `orchestrator.rs` (stale-task recovery and batch draining),
//! `processor.rs` (the per-task fetch/decode/parse/write/submit pipeline).

pub mod bootstrap;
pub mod orchestrator;
pub mod processor;

pub use orchestrator::{BatchSummary, Orchestrator};
pub use processor::FileProcessor;
