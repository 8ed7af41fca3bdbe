//! Command-line arguments

use camwatch_core::{Config, ConfigError, MediaKind, SelectionPolicy};
use clap::Parser;
use std::path::PathBuf;

/// camwatch - relay new camera snapshots and clips to a webhook
#[derive(Debug, Parser)]
#[command(name = "camwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Camera name reported in every notification
    pub camera_name: String,

    /// Webhook endpoint; omit to only track (and optionally copy) new files
    pub webhook_url: Option<String>,

    /// TOML config file (command-line options take precedence)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Candidate selection: "mtime" or "name"
    #[arg(long)]
    pub policy: Option<SelectionPolicy>,

    /// Delay between polling cycles in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Directory holding last-seen state files
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Root of the timestamped image directories
    #[arg(long)]
    pub image_root: Option<PathBuf>,

    /// Glob for image files
    #[arg(long)]
    pub image_pattern: Option<String>,

    /// Root of the timestamped video directories
    #[arg(long)]
    pub video_root: Option<PathBuf>,

    /// Glob for video files
    #[arg(long)]
    pub video_pattern: Option<String>,

    /// Only watch images
    #[arg(long, conflicts_with_all = ["video_root", "video_pattern"])]
    pub no_video: bool,

    /// Keep a copy of the latest image at this path
    #[arg(long)]
    pub copy_latest: Option<PathBuf>,

    /// Accept invalid TLS certificates from the webhook endpoint
    #[arg(long)]
    pub insecure: bool,

    /// Webhook request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Extra delivery attempts after a failure (default: 0)
    #[arg(long)]
    pub retries: Option<u32>,

    /// Also write daily log files to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Merge defaults, the config file and these arguments, then validate
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        config.camera.name = self.camera_name;
        if self.webhook_url.is_some() {
            config.webhook.url = self.webhook_url;
        }

        if let Some(policy) = self.policy {
            config.watch.policy = policy;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.watch.interval_ms = interval_ms;
        }
        if let Some(dir) = self.state_dir {
            config.state.dir = dir;
        }

        if let Some(root) = self.image_root {
            config.target_mut(MediaKind::Image).root = root;
        }
        if let Some(pattern) = self.image_pattern {
            config.target_mut(MediaKind::Image).pattern = pattern;
        }
        if self.no_video {
            config.remove_target(MediaKind::Video);
        } else {
            if let Some(root) = self.video_root {
                config.target_mut(MediaKind::Video).root = root;
            }
            if let Some(pattern) = self.video_pattern {
                config.target_mut(MediaKind::Video).pattern = pattern;
            }
        }

        if let Some(destination) = self.copy_latest {
            config.copy.destination = Some(destination);
        }

        if self.insecure {
            config.webhook.accept_invalid_certs = true;
        }
        if let Some(secs) = self.timeout_secs {
            config.webhook.timeout_secs = secs;
        }
        if let Some(retries) = self.retries {
            config.webhook.max_attempts = retries.saturating_add(1);
        }

        if let Some(dir) = self.log_dir {
            config.logging.dir = Some(dir);
        }

        config.validate()?;
        Ok(config)
    }
}
