//! Per-target last-seen record

use camwatch_core::Notification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Latest file reported for one watch target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSeen {
    /// File that was reported
    pub path: PathBuf,
    /// Its modification time when detected (high-water mark for mtime polling)
    pub modified: Option<DateTime<Utc>>,
    /// Notification that was published for it
    pub notification: Notification,
    /// When the detection happened
    pub recorded_at: DateTime<Utc>,
}

impl LastSeen {
    pub fn new(path: PathBuf, modified: Option<SystemTime>, notification: Notification) -> Self {
        Self {
            path,
            modified: modified.map(DateTime::<Utc>::from),
            notification,
            recorded_at: Utc::now(),
        }
    }

    /// Recorded modification time as a `SystemTime`
    pub fn modified_time(&self) -> Option<SystemTime> {
        self.modified.map(SystemTime::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camwatch_core::MediaKind;
    use std::path::Path;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_modified_keeps_sub_second_precision() {
        let mtime = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let path = Path::new("/alarm/20231114/a.jpg");
        let entry = LastSeen::new(
            path.to_path_buf(),
            Some(mtime),
            Notification::for_file("porch", MediaKind::Image, path),
        );

        let json = serde_json::to_string(&entry).unwrap();
        let back: LastSeen = serde_json::from_str(&json).unwrap();

        assert_eq!(back.modified_time(), Some(mtime));
        assert_eq!(back, entry);
    }
}
