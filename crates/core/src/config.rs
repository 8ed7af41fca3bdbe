//! Daemon configuration
//!
//! Loaded from an optional TOML file; the CLI layers its own overrides on
//! top before calling [`Config::validate`].

use crate::media::{MediaKind, WatchTarget};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default root the camera firmware writes alarm media to
pub const DEFAULT_MEDIA_ROOT: &str = "/media/mmc/alarm";

/// Default directory for persisted state and the latest-image copy
pub const DEFAULT_STATE_DIR: &str = "/media/mmc/wz_mini/www";

/// Startup configuration errors (always fatal)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("camera name is required")]
    MissingCameraName,

    #[error("{key} = {value} is out of range ({range})")]
    OutOfRange {
        key: &'static str,
        value: u64,
        range: &'static str,
    },

    #[error("invalid webhook URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no watch targets configured")]
    NoTargets,

    #[error("watch target '{0}' is configured more than once")]
    DuplicateTarget(MediaKind),

    #[error("watch target '{0}' has an empty pattern")]
    EmptyPattern(MediaKind),

    #[error("unknown selection policy '{0}' (expected 'name' or 'mtime')")]
    UnknownPolicy(String),
}

/// How the scanner picks the newest candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Newest subdirectory by name, then last file by name
    #[serde(alias = "name_ordering")]
    Name,
    /// Latest modification time across all subdirectories
    #[default]
    #[serde(alias = "modified_time")]
    Mtime,
}

impl FromStr for SelectionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" | "name_ordering" => Ok(SelectionPolicy::Name),
            "mtime" | "modified_time" => Ok(SelectionPolicy::Mtime),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Name reported in every notification
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Delay between polling cycles
    pub interval_ms: u64,
    pub policy: SelectionPolicy,
    /// Abandon a directory scan after this long (unset = wait forever)
    pub scan_timeout_secs: Option<u64>,
    pub targets: Vec<WatchTarget>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            policy: SelectionPolicy::default(),
            scan_timeout_secs: None,
            targets: MediaKind::ALL
                .iter()
                .map(|kind| WatchTarget::with_default_pattern(*kind, DEFAULT_MEDIA_ROOT))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Endpoint to POST notifications to; unset or empty disables delivery
    pub url: Option<String>,
    /// Skip TLS certificate validation (self-signed endpoints on the LAN)
    pub accept_invalid_certs: bool,
    pub timeout_secs: u64,
    /// Total attempts per notification (1 = no retry)
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each further attempt
    pub backoff_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            accept_invalid_certs: false,
            timeout_secs: 30,
            max_attempts: 1,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STATE_DIR),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Where the latest detected file is copied; unset disables copying
    pub destination: Option<PathBuf>,
    /// Kinds that are copied
    pub kinds: Vec<MediaKind>,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            destination: None,
            kinds: vec![MediaKind::Image],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Also write daily-rolling log files here
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub watch: WatchConfig,
    pub webhook: WebhookConfig,
    pub state: StateConfig,
    pub copy: CopyConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Check ranges and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.name.trim().is_empty() {
            return Err(ConfigError::MissingCameraName);
        }

        check_range("watch.interval_ms", self.watch.interval_ms, 100, 3_600_000, "100-3,600,000")?;
        if let Some(secs) = self.watch.scan_timeout_secs {
            check_range("watch.scan_timeout_secs", secs, 1, 3600, "1-3600")?;
        }
        check_range("webhook.timeout_secs", self.webhook.timeout_secs, 1, 600, "1-600")?;
        check_range(
            "webhook.max_attempts",
            u64::from(self.webhook.max_attempts),
            1,
            10,
            "1-10",
        )?;
        check_range("webhook.backoff_ms", self.webhook.backoff_ms, 0, 60_000, "0-60,000")?;

        if self.watch.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        let mut seen = Vec::with_capacity(self.watch.targets.len());
        for target in &self.watch.targets {
            if seen.contains(&target.kind) {
                return Err(ConfigError::DuplicateTarget(target.kind));
            }
            if target.pattern.trim().is_empty() {
                return Err(ConfigError::EmptyPattern(target.kind));
            }
            seen.push(target.kind);
        }

        if let Some(url) = self.webhook_url() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    url: url.to_string(),
                    reason: "scheme must be http or https".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Webhook endpoint, or `None` when delivery is disabled
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.watch.interval_ms)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.watch.scan_timeout_secs.map(Duration::from_secs)
    }

    pub fn target(&self, kind: MediaKind) -> Option<&WatchTarget> {
        self.watch.targets.iter().find(|t| t.kind == kind)
    }

    /// Mutable access to the target for `kind`, inserting a default one
    pub fn target_mut(&mut self, kind: MediaKind) -> &mut WatchTarget {
        if let Some(idx) = self.watch.targets.iter().position(|t| t.kind == kind) {
            &mut self.watch.targets[idx]
        } else {
            self.watch
                .targets
                .push(WatchTarget::with_default_pattern(kind, DEFAULT_MEDIA_ROOT));
            let last = self.watch.targets.len() - 1;
            &mut self.watch.targets[last]
        }
    }

    pub fn remove_target(&mut self, kind: MediaKind) {
        self.watch.targets.retain(|t| t.kind != kind);
    }
}

fn check_range(
    key: &'static str,
    value: u64,
    min: u64,
    max: u64,
    range: &'static str,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { key, value, range })
    }
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# camwatch configuration

[camera]
name = "front-door"

[watch]
# Delay between polling cycles (100-3,600,000)
interval_ms = 1000
# "mtime" (latest modification time) or "name" (newest directory, last file by name)
policy = "mtime"
# scan_timeout_secs = 10

[[watch.targets]]
kind = "image"
root = "/media/mmc/alarm"
pattern = "*.jpg"

[[watch.targets]]
kind = "video"
root = "/media/mmc/alarm"
pattern = "*.mp4"

[webhook]
# url = "https://homeassistant.local:8123/api/webhook/camera"
accept_invalid_certs = false
timeout_secs = 30
max_attempts = 1
backoff_ms = 500

[state]
dir = "/media/mmc/wz_mini/www"

[copy]
# destination = "/media/mmc/wz_mini/www/latest.jpg"
kinds = ["image"]

[logging]
level = "info"
# dir = "/media/mmc/wz_mini/log"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Config {
        let mut config = Config::default();
        config.camera.name = name.to_string();
        config
    }

    #[test]
    fn test_defaults_watch_images_and_videos() {
        let config = Config::default();
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.watch.policy, SelectionPolicy::Mtime);
        assert_eq!(config.target(MediaKind::Image).unwrap().pattern, "*.jpg");
        assert_eq!(config.target(MediaKind::Video).unwrap().pattern, "*.mp4");
        assert!(!config.webhook.accept_invalid_certs);
        assert_eq!(config.webhook.max_attempts, 1);
    }

    #[test]
    fn test_example_config_parses_and_validates() {
        let config = Config::from_toml_str(example_config()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.camera.name, "front-door");
        assert_eq!(config.watch.targets.len(), 2);
        assert!(config.webhook_url().is_none());
    }

    #[test]
    fn test_missing_camera_name_is_fatal() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCameraName));
    }

    #[test]
    fn test_empty_url_disables_delivery() {
        let mut config = named("porch");
        config.webhook.url = Some("   ".to_string());
        config.validate().unwrap();
        assert!(config.webhook_url().is_none());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut config = named("porch");
        config.webhook.url = Some("ftp://example.com".to_string());
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidUrl { .. }
        ));
    }

    #[test]
    fn test_interval_range() {
        let mut config = named("porch");
        config.watch.interval_ms = 10;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::OutOfRange { key: "watch.interval_ms", .. }
        ));
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let mut config = named("porch");
        config
            .watch
            .targets
            .push(WatchTarget::with_default_pattern(MediaKind::Image, "/tmp"));
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::DuplicateTarget(MediaKind::Image)
        ));
    }

    #[test]
    fn test_target_mut_inserts_missing_target() {
        let mut config = named("porch");
        config.remove_target(MediaKind::Video);
        assert!(config.target(MediaKind::Video).is_none());

        config.target_mut(MediaKind::Video).pattern = "*.avi".to_string();
        assert_eq!(config.target(MediaKind::Video).unwrap().pattern, "*.avi");
    }

    #[test]
    fn test_policy_aliases() {
        assert_eq!("name".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::Name);
        assert_eq!(
            "modified_time".parse::<SelectionPolicy>().unwrap(),
            SelectionPolicy::Mtime
        );
        assert!("newest".parse::<SelectionPolicy>().is_err());

        let config = Config::from_toml_str("[watch]\npolicy = \"name_ordering\"\n").unwrap();
        assert_eq!(config.watch.policy, SelectionPolicy::Name);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
