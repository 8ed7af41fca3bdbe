//! Directory scanner
//!
//! Finds the newest candidate file under a watch target's root. The root
//! holds timestamp-named subdirectories written by the camera firmware;
//! candidates live one level below it.

use camwatch_core::{SelectionPolicy, WatchTarget};
use glob::Pattern;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Transient scan failures; the cycle is skipped and polling continues
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to list {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to stat {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scan of {root} timed out after {timeout:?}")]
    TimedOut { root: PathBuf, timeout: Duration },

    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A file matching the target's pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

/// Blocking source of candidates for a poll loop
pub trait Scan: Send + Sync + 'static {
    fn target(&self) -> &WatchTarget;

    /// Newest matching file, or `None` when nothing matches yet
    fn scan(&self) -> Result<Option<Candidate>, ScanError>;
}

/// Scanner for one watch target
#[derive(Debug, Clone)]
pub struct Scanner {
    target: WatchTarget,
    policy: SelectionPolicy,
}

impl Scanner {
    pub fn new(target: WatchTarget, policy: SelectionPolicy) -> Self {
        Self { target, policy }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Find the newest candidate, or `None` when nothing matches yet
    ///
    /// Blocking; the poll loop runs it on the blocking pool.
    pub fn scan(&self) -> Result<Option<Candidate>, ScanError> {
        match self.policy {
            SelectionPolicy::Name => self.newest_by_name(),
            SelectionPolicy::Mtime => self.newest_by_mtime(),
        }
    }

    /// Newest subdirectory by name, then the last matching file by name
    fn newest_by_name(&self) -> Result<Option<Candidate>, ScanError> {
        let dir = match newest_subdirectory(&self.target.root)? {
            Some(dir) => dir,
            None => return Ok(None),
        };

        let mut files = glob_files(&join_pattern(&dir, &self.target.pattern))?;

        // Plain string order: a10.jpg sorts before a2.jpg
        files.sort();

        Ok(files.pop().map(|path| {
            let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
            Candidate { path, modified }
        }))
    }

    /// Latest modification time across every subdirectory
    fn newest_by_mtime(&self) -> Result<Option<Candidate>, ScanError> {
        let pattern = join_pattern(&self.target.root, &format!("*/{}", self.target.pattern));
        let mut newest: Option<(SystemTime, PathBuf)> = None;

        for path in glob_files(&pattern)? {
            let mtime = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => mtime,
                // Rotated away between the listing and the stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(ScanError::Metadata { path, source }),
            };

            let is_newer = match &newest {
                Some((best_mtime, best_path)) => (mtime, &path) > (*best_mtime, best_path),
                None => true,
            };
            if is_newer {
                newest = Some((mtime, path));
            }
        }

        Ok(newest.map(|(mtime, path)| Candidate {
            path,
            modified: Some(mtime),
        }))
    }
}

/// Immediate subdirectory of `root` with the greatest name
///
/// Timestamp-named directories sort chronologically this way. A missing
/// root is treated as not ready yet.
pub fn newest_subdirectory(root: &Path) -> Result<Option<PathBuf>, ScanError> {
    let mut names = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_not_found(&e) => {
                debug!("{} does not exist yet", root.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(ScanError::List {
                    path: root.to_path_buf(),
                    source,
                })
            }
        };

        if entry.file_type().is_dir() {
            names.push(entry.file_name().to_os_string());
        }
    }

    names.sort_by(|a, b| b.cmp(a));
    Ok(names.into_iter().next().map(|name| root.join(name)))
}

fn is_not_found(e: &walkdir::Error) -> bool {
    e.depth() == 0 && e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound)
}

/// Glob `pattern` below `dir`, with `dir` itself matched literally
fn join_pattern(dir: &Path, pattern: &str) -> String {
    format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), pattern)
}

/// Regular files matching `pattern`; unreadable entries are skipped
fn glob_files(pattern: &str) -> Result<Vec<PathBuf>, ScanError> {
    let paths = glob::glob(pattern).map_err(|source| ScanError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => debug!("Skipping unreadable glob entry: {}", e),
        }
    }
    Ok(files)
}

impl Scan for Scanner {
    fn target(&self) -> &WatchTarget {
        &self.target
    }

    fn scan(&self) -> Result<Option<Candidate>, ScanError> {
        Scanner::scan(self)
    }
}
