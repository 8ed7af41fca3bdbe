//! Polling-based media watching for camwatch
//!
//! This crate provides:
//! - Directory scanning with name-ordering and mtime selection policies
//! - Change detection with field-wise deduplication
//! - The per-target poll loop with cooperative cancellation

pub mod detect;
pub mod poll;
pub mod scan;

// Re-exports
pub use detect::{ChangeDetector, Decision, Unchanged};
pub use poll::{CycleOutcome, PollLoop};
pub use scan::{Candidate, Scan, ScanError, Scanner};
