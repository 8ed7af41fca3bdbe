//! State store: in-memory map backed by one JSON file per target
//!
//! Layout of the state directory:
//! ```text
//! <state dir>/
//!   last-image.json
//!   last-video.json
//!   last_jpg_path.txt   (older single-stream state, read-only fallback)
//! ```
//!
//! The in-memory entry is authoritative for the life of the process. Files
//! are only read at startup and rewritten after each detection, so a failed
//! write at most causes one repeated notification after a restart.

use crate::state::LastSeen;
use camwatch_core::{MediaKind, Notification};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Bare-path image state written by the single-stream monitor
pub const LEGACY_IMAGE_STATE: &str = "last_jpg_path.txt";

/// Failures reading or writing state files
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode state for {kind}: {source}")]
    Encode {
        kind: MediaKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Last-seen state for every watch target
pub struct StateStore {
    dir: PathBuf,
    entries: RwLock<HashMap<MediaKind, LastSeen>>,
}

impl StateStore {
    /// Open the store and load whatever state survives from a previous run
    ///
    /// Never fails: an unusable directory or unreadable file just means the
    /// process starts with no prior state.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();

        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Failed to create state directory {}: {}", dir.display(), e);
        }

        let mut entries = HashMap::new();
        for kind in MediaKind::ALL {
            let path = state_file(&dir, kind);
            match read_entry(&path) {
                Ok(Some(entry)) => {
                    info!("Loaded {} state: {}", kind, entry.path.display());
                    entries.insert(kind, entry);
                }
                Ok(None) => debug!("No previous {} state at {}", kind, path.display()),
                Err(e) => warn!("Ignoring {} state: {}", kind, e),
            }
        }

        if !entries.contains_key(&MediaKind::Image) {
            match read_legacy_image(&dir.join(LEGACY_IMAGE_STATE)) {
                Ok(Some(entry)) => {
                    info!("Loaded legacy image state: {}", entry.path.display());
                    entries.insert(MediaKind::Image, entry);
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring legacy image state: {}", e),
            }
        }

        Self {
            dir,
            entries: RwLock::new(entries),
        }
    }

    /// Directory the state files live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for `kind`
    pub fn state_file(&self, kind: MediaKind) -> PathBuf {
        state_file(&self.dir, kind)
    }

    /// Current last-seen entry for `kind`
    pub fn get(&self, kind: MediaKind) -> Option<LastSeen> {
        self.entries.read().get(&kind).cloned()
    }

    /// Record a new entry for `kind` and persist it
    ///
    /// The in-memory entry is updated even when the write fails.
    pub fn record(&self, kind: MediaKind, entry: LastSeen) -> Result<(), StateError> {
        let encoded = serde_json::to_vec_pretty(&entry)
            .map_err(|source| StateError::Encode { kind, source });

        self.entries.write().insert(kind, entry);

        let path = self.state_file(kind);
        write_atomic(&self.dir, &path, &encoded?)
            .map_err(|source| StateError::Write { path, source })
    }
}

fn state_file(dir: &Path, kind: MediaKind) -> PathBuf {
    dir.join(format!("last-{}.json", kind.as_str()))
}

/// Read one state file; a missing file is `Ok(None)`
pub fn read_entry(path: &Path) -> Result<Option<LastSeen>, StateError> {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StateError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&contents)
        .map(Some)
        .map_err(|source| StateError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// Read a bare-path state file; missing or blank is `Ok(None)`
///
/// The file carries no camera name or mtime, so the mtime is taken from the
/// referenced file when it still exists.
pub fn read_legacy_image(path: &Path) -> Result<Option<LastSeen>, StateError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StateError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let image = contents.trim();
    if image.is_empty() {
        return Ok(None);
    }

    let image = PathBuf::from(image);
    let modified = std::fs::metadata(&image).and_then(|m| m.modified()).ok();
    let notification = Notification::for_file(String::new(), MediaKind::Image, &image);
    Ok(Some(LastSeen::new(image, modified, notification)))
}

fn write_atomic(dir: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    // Readable by the camera's web server, like the files it replaces
    make_shared(tmp.as_file())?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn make_shared(file: &std::fs::File) -> io::Result<()> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn make_shared(_file: &std::fs::File) -> io::Result<()> {
    Ok(())
}
