//! Command handlers -- one module per subcommand

pub mod config;
pub mod fetch;
pub mod parse;
pub mod patterns;

use std::path::{Path, PathBuf};

use logmirror_core::config::MirrorConfig;

use crate::error::CliError;

/// Pick the pattern directory: an explicit flag wins, otherwise `[catalog] pattern_dir`.
pub(crate) async fn resolve_pattern_dir(
    config_path: &Path,
    explicit: Option<PathBuf>,
) -> Result<PathBuf, CliError> {
    match explicit {
        Some(dir) => Ok(dir),
        None => {
            let config = MirrorConfig::load(config_path).await?;
            Ok(PathBuf::from(config.catalog.pattern_dir))
        }
    }
}
