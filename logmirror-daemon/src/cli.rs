//! CLI argument definitions for logmirror-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// logmirror ingestion daemon.
///
/// Polls every enabled remote collector, mirrors the fetched syslog records,
/// runs them through the pattern catalog and advances per-collector checkpoints.
#[derive(Parser, Debug)]
#[command(name = "logmirror-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logmirror.toml configuration file.
    #[arg(short, long, default_value = "/etc/logmirror/logmirror.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and pattern catalog, then exit.
    #[arg(long)]
    pub validate: bool,

    /// Run a single ingestion pass and exit.
    #[arg(long)]
    pub once: bool,
}
