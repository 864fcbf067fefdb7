//! Re-exports of the typed shapes consumed and produced by this crate.
//!
//! The record shape itself lives in [`crate::record`]; this module exists
//! so callers outside the crate can name [`Record`] and [`Value`] without
//! reaching into the implementation module directly.

pub use crate::record::{Record, Value};
