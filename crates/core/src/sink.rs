//! Destinations a detection is published to

use crate::media::MediaKind;
use crate::notification::Notification;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// A newly detected file, ready to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub kind: MediaKind,
    /// Detected file on disk
    pub path: PathBuf,
    pub notification: Notification,
}

/// Something a detection is handed to (webhook, local copy, ...)
///
/// Failures are reported to the poll loop, which logs them and carries on.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name for log lines
    fn name(&self) -> &str;

    async fn publish(&self, detection: &Detection) -> Result<()>;
}
