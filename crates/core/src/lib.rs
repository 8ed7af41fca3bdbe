//! Core types for camwatch
//!
//! This crate provides:
//! - Watch targets and media kinds
//! - The notification payload sent to webhooks
//! - Daemon configuration (TOML)
//! - The `Sink` seam detections are published through

pub mod config;
pub mod media;
pub mod notification;
pub mod sink;

// Re-exports
pub use config::{Config, ConfigError, SelectionPolicy};
pub use media::{MediaKind, WatchTarget};
pub use notification::Notification;
pub use sink::{Detection, Sink};
