//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// logmirror -- syslog mirroring and pattern-based field extraction.
///
/// Use `logmirror <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logmirror", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logmirror.toml configuration file.
    #[arg(short, long, default_value = "logmirror.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and validate message pattern files.
    Patterns(PatternsArgs),

    /// Classify a single message against the pattern catalog (dry run).
    Parse(ParseArgs),

    /// Run one ingestion pass over the configured collectors.
    Fetch(FetchArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- patterns ----

/// Inspect and validate message pattern files.
#[derive(Args, Debug)]
pub struct PatternsArgs {
    #[command(subcommand)]
    pub action: PatternsAction,
}

#[derive(Subcommand, Debug)]
pub enum PatternsAction {
    /// List active patterns in match order (highest priority first).
    List {
        /// Pattern directory (default: `[catalog] pattern_dir` from config).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Validate every pattern file in a directory and report per-file errors.
    Validate {
        /// Directory containing YAML pattern files.
        #[arg(default_value = "/etc/logmirror/patterns")]
        path: PathBuf,
    },
}

// ---- parse ----

/// Classify a message without writing anything.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Raw syslog message text.
    pub message: String,

    /// Pattern directory (default: `[catalog] pattern_dir` from config).
    #[arg(long)]
    pub patterns: Option<PathBuf>,
}

// ---- fetch ----

/// Run a single ingestion pass.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Only fetch from the collector with this id.
    #[arg(long)]
    pub collector: Option<i64>,

    /// Use an in-memory store; nothing is persisted and checkpoints are not advanced on disk.
    #[arg(long)]
    pub dry_run: bool,
}

// ---- config ----

/// Manage logmirror configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section
        /// (general, catalog, ingest, storage, quota, metrics, collectors).
        #[arg(long)]
        section: Option<String>,
    },
}
