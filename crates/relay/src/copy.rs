//! Keeps a copy of the latest detected file at a fixed path

use anyhow::{Context, Result};
use async_trait::async_trait;
use camwatch_core::config::CopyConfig;
use camwatch_core::{Detection, MediaKind, Sink};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Copies detections of selected kinds to `destination`
///
/// The copy is written next to the destination and renamed into place, so
/// readers (e.g. the camera's web server) never see a partial file. The
/// result is mode 0644 on unix so a non-root web server can serve it.
pub struct CopySink {
    destination: PathBuf,
    kinds: Vec<MediaKind>,
}

impl CopySink {
    pub fn new(destination: impl Into<PathBuf>, kinds: Vec<MediaKind>) -> Self {
        Self {
            destination: destination.into(),
            kinds,
        }
    }

    /// `None` when copying is not configured
    pub fn from_config(config: &CopyConfig) -> Option<Self> {
        config
            .destination
            .as_ref()
            .map(|destination| Self::new(destination.clone(), config.kinds.clone()))
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn handles(&self, kind: MediaKind) -> bool {
        self.kinds.contains(&kind)
    }
}

#[async_trait]
impl Sink for CopySink {
    fn name(&self) -> &str {
        "copy"
    }

    async fn publish(&self, detection: &Detection) -> Result<()> {
        if !self.handles(detection.kind) {
            return Ok(());
        }

        let source = detection.path.clone();
        let destination = self.destination.clone();
        tokio::task::spawn_blocking(move || copy_atomic(&source, &destination))
            .await
            .context("Copy task panicked")??;

        info!(
            "Copied latest {} to {}",
            detection.kind,
            self.destination.display()
        );
        Ok(())
    }
}

fn copy_atomic(source: &Path, destination: &Path) -> Result<()> {
    let dir = match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut input =
        File::open(source).with_context(|| format!("Failed to open {}", source.display()))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    make_shared(tmp.as_file())
        .with_context(|| format!("Failed to set permissions in {}", dir.display()))?;

    std::io::copy(&mut input, &mut tmp)
        .with_context(|| format!("Failed to copy {}", source.display()))?;
    tmp.persist(destination)
        .with_context(|| format!("Failed to replace {}", destination.display()))?;

    Ok(())
}

#[cfg(unix)]
fn make_shared(file: &File) -> std::io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn make_shared(_file: &File) -> std::io::Result<()> {
    Ok(())
}
