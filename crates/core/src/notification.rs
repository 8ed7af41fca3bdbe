//! Webhook notification payload

use crate::media::MediaKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Message describing a newly detected file
///
/// Serialized as `{"cameraName", "jpgPath", "mp4Path"}`. Both path keys are
/// always written; the one not populated by this detection is `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub camera_name: String,
    #[serde(rename = "jpgPath", default)]
    pub image_path: Option<PathBuf>,
    #[serde(rename = "mp4Path", default)]
    pub video_path: Option<PathBuf>,
}

impl Notification {
    /// Notification for a single detected file of `kind`
    pub fn for_file(camera_name: impl Into<String>, kind: MediaKind, path: &Path) -> Self {
        let mut notification = Self {
            camera_name: camera_name.into(),
            image_path: None,
            video_path: None,
        };
        match kind {
            MediaKind::Image => notification.image_path = Some(path.to_path_buf()),
            MediaKind::Video => notification.video_path = Some(path.to_path_buf()),
        }
        notification
    }

    /// Path populated for `kind`, if any
    pub fn path_for(&self, kind: MediaKind) -> Option<&Path> {
        match kind {
            MediaKind::Image => self.image_path.as_deref(),
            MediaKind::Video => self.video_path.as_deref(),
        }
    }

    /// Encode to the JSON wire body
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_wire_keys() {
        let n = Notification::for_file("porch", MediaKind::Image, Path::new("/alarm/20230201/a2.jpg"));
        let value: Value = serde_json::from_slice(&n.to_json().unwrap()).unwrap();

        assert_eq!(value["cameraName"], "porch");
        assert_eq!(value["jpgPath"], "/alarm/20230201/a2.jpg");
        assert!(value["mp4Path"].is_null());
        assert_eq!(value.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_video_notification_populates_mp4_path() {
        let n = Notification::for_file("porch", MediaKind::Video, Path::new("/alarm/x/clip.mp4"));
        assert_eq!(n.path_for(MediaKind::Video), Some(Path::new("/alarm/x/clip.mp4")));
        assert_eq!(n.path_for(MediaKind::Image), None);
    }

    #[test]
    fn test_equality_is_field_wise() {
        let a = Notification::for_file("porch", MediaKind::Image, Path::new("/a/1.jpg"));
        let b = Notification::for_file("porch", MediaKind::Image, Path::new("/a/1.jpg"));
        let renamed = Notification::for_file("garage", MediaKind::Image, Path::new("/a/1.jpg"));

        assert_eq!(a, b);
        assert_ne!(a, renamed);
    }

    #[test]
    fn test_decodes_payload_without_optional_keys() {
        let n: Notification = serde_json::from_str(r#"{"cameraName":"porch","jpgPath":"/a.jpg"}"#).unwrap();
        assert_eq!(n.image_path.as_deref(), Some(Path::new("/a.jpg")));
        assert!(n.video_path.is_none());
    }
}
