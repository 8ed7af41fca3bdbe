//! camwatch daemon library: argument handling, logging and lifecycle

pub mod args;
pub mod daemon;
pub mod logging;

pub use args::Cli;
pub use daemon::Daemon;
