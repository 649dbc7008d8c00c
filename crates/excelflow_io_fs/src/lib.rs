//! `excelflow_io_fs` v1:
//! Rust-side filesystem probes used before workbook writes.
//!
//! Module layout:
//! - `lock` : append-open lock probe
//! - `spec` : probe result enums
//! - `util` : shared helper functions

pub mod lock;
pub mod spec;
mod util;

pub use lock::{derive_lock_state, is_file_locked, probe_file_lock};
pub use spec::EnumLockState;
