//! camwatch - camera media watcher

use anyhow::Result;
use camwatch_cli::{logging, Cli, Daemon};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    let _log_guard = logging::init(&config.logging)?;

    Daemon::new(config)?.run().await
}
