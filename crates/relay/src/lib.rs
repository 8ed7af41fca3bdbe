//! Sinks that publish detections
//!
//! - `WebhookClient` / `WebhookSink`: JSON POST to the configured endpoint
//! - `CopySink`: copy of the latest file at a fixed path

pub mod copy;
pub mod webhook;

// Re-exports
pub use copy::CopySink;
pub use webhook::{DeliveryError, DeliveryOutcome, DeliveryPolicy, WebhookClient, WebhookSink};
