//! CLI-specific error types and exit code mapping

use logmirror_core::error::MirrorError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Pattern catalog could not be loaded or failed validation.
    #[error("pattern error: {0}")]
    Catalog(String),

    /// One or more collectors failed during a fetch pass.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logmirror-core.
    #[error("{0}")]
    Core(#[from] MirrorError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                         |
    /// |------|---------------------------------|
    /// | 0    | Success                         |
    /// | 1    | General / command error         |
    /// | 2    | Configuration error             |
    /// | 3    | Pattern catalog error           |
    /// | 4    | Collector fetch failure         |
    /// | 10   | IO error                        |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(MirrorError::Config(_)) => 2,
            Self::Catalog(_) | Self::Core(MirrorError::Catalog(_)) => 3,
            Self::Fetch(_) | Self::Core(MirrorError::Collector(_)) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<logmirror_parse_engine::ParseEngineError> for CliError {
    fn from(e: logmirror_parse_engine::ParseEngineError) -> Self {
        Self::Catalog(e.to_string())
    }
}

impl From<logmirror_ingest::IngestError> for CliError {
    fn from(e: logmirror_ingest::IngestError) -> Self {
        Self::Fetch(e.to_string())
    }
}

impl From<logmirror_core::error::StorageError> for CliError {
    fn from(e: logmirror_core::error::StorageError) -> Self {
        Self::Command(format!("storage error: {e}"))
    }
}
