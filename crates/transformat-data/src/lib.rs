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

//! Postgres-backed repositories and advisory-lock coordination for the
//! `transformat` worker.
//!
//! Layout: `task_repo.rs`, `file_repo.rs`, `sequence.rs`, `lock.rs`;
//! `support.rs` holds the shared `sqlx::Error` → catalogue-error mapping.

mod support;

pub mod file_repo;
pub mod lock;
pub mod sequence;
pub mod task_repo;

pub use file_repo::{
    Encoding, FieldDefinition, FieldType, FileRecord, FileRecordRepository, FormatType,
    TransformType,
};
pub use lock::{FileLock, LockManager};
pub use sequence::SequenceGenerator;
pub use task_repo::{DEFAULT_STALE_THRESHOLD_HOURS, FileTask, TaskRepository, TaskStatus};
