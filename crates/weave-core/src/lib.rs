//! Foundational low-level utilities shared across Weave crates.
//!
//! Provides the atomic file-write helper used by story persistence and the
//! Unix timestamp utilities stamped into persisted snapshots.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms};
