//! Change detection and deduplication

use crate::scan::Candidate;
use camwatch_core::{MediaKind, Notification, SelectionPolicy};
use camwatch_journal::LastSeen;

/// Outcome of comparing a candidate against the last recorded state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Genuinely new file
    Detected(Notification),
    Unchanged(Unchanged),
}

/// Why a candidate was not reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unchanged {
    /// Not strictly newer than the recorded file
    NotNewer,
    /// Same notification as the last one delivered
    Duplicate,
}

/// Decides whether a scanned candidate is a new event for one target
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    camera_name: String,
    kind: MediaKind,
    policy: SelectionPolicy,
}

impl ChangeDetector {
    pub fn new(camera_name: impl Into<String>, kind: MediaKind, policy: SelectionPolicy) -> Self {
        Self {
            camera_name: camera_name.into(),
            kind,
            policy,
        }
    }

    /// Compare `candidate` against `previous`
    ///
    /// With no previous state everything is new. Otherwise the candidate has
    /// to be strictly newer (by `(mtime, path)` or by path order, per policy)
    /// and its notification must differ from the last one in at least one
    /// field.
    pub fn evaluate(&self, candidate: &Candidate, previous: Option<&LastSeen>) -> Decision {
        let notification = Notification::for_file(&self.camera_name, self.kind, &candidate.path);

        let previous = match previous {
            Some(previous) => previous,
            None => return Decision::Detected(notification),
        };

        if !self.is_newer(candidate, previous) {
            return Decision::Unchanged(Unchanged::NotNewer);
        }

        if notification == previous.notification {
            return Decision::Unchanged(Unchanged::Duplicate);
        }

        Decision::Detected(notification)
    }

    fn is_newer(&self, candidate: &Candidate, previous: &LastSeen) -> bool {
        match self.policy {
            // Same ordering the scanner picks with, so equal mtimes fall back to the path
            SelectionPolicy::Mtime => match (candidate.modified, previous.modified_time()) {
                (Some(current), Some(seen)) => {
                    (current, &candidate.path) > (seen, &previous.path)
                }
                (None, Some(_)) => false,
                (_, None) => true,
            },
            SelectionPolicy::Name => candidate.path > previous.path,
        }
    }
}
