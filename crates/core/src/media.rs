//! Media kinds and watch targets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of media a watch target produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still images (motion snapshots)
    Image,
    /// Video clips
    Video,
}

impl MediaKind {
    /// All kinds, in the order their loops are started
    pub const ALL: [MediaKind; 2] = [MediaKind::Image, MediaKind::Video];

    /// Stable lowercase key used in config and state file names
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Glob used when the config does not name one
    pub fn default_pattern(&self) -> &'static str {
        match self {
            MediaKind::Image => "*.jpg",
            MediaKind::Video => "*.mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (root, pattern, kind) tuple under independent polling
///
/// The root holds timestamp-named subdirectories; the pattern is matched
/// against file names inside them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchTarget {
    /// Media kind, also the key for persisted state
    pub kind: MediaKind,
    /// Directory containing the timestamp-named subdirectories
    pub root: PathBuf,
    /// Glob for candidate file names (e.g. `*.jpg`)
    pub pattern: String,
}

impl WatchTarget {
    pub fn new(kind: MediaKind, root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            root: root.into(),
            pattern: pattern.into(),
        }
    }

    /// Target for `kind` under `root` with the kind's default pattern
    pub fn with_default_pattern(kind: MediaKind, root: impl Into<PathBuf>) -> Self {
        Self::new(kind, root, kind.default_pattern())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.kind, self.root.display(), self.pattern)
    }
}
