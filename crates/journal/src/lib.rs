//! Last-seen state for watch targets
//!
//! This crate provides:
//! - The `LastSeen` record kept per watch target
//! - `StateStore`, an in-memory map backed by one JSON file per target

pub mod state;
pub mod store;

// Re-exports
pub use state::LastSeen;
pub use store::{StateError, StateStore};
