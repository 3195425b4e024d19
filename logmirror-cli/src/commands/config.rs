//! `logmirror config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logmirror_core::config::MirrorConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const SECTIONS: [&str; 7] = [
    "general",
    "catalog",
    "ingest",
    "storage",
    "quota",
    "metrics",
    "collectors",
];

const REDACTED: &str = "***REDACTED***";

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => {
            let report = validate(config_path).await;
            writer.render(&report)?;
            if !report.valid {
                return Err(CliError::Config("configuration is invalid".to_owned()));
            }
            Ok(())
        }
        ConfigAction::Show { section } => {
            info!(path = %config_path.display(), "loading configuration");
            let config = MirrorConfig::load(config_path).await?;
            let report = show(config_path, config, section.as_deref())?;
            writer.render(&report)
        }
    }
}

/// Load and validate the file, collecting the error instead of returning it.
pub async fn validate(config_path: &Path) -> ConfigValidationReport {
    info!(path = %config_path.display(), "validating configuration");

    let source = config_path.display().to_string();
    match MirrorConfig::load(config_path).await {
        Ok(config) => ConfigValidationReport {
            source,
            valid: true,
            collectors: config.collectors.len(),
            enabled_collectors: config.active_collectors().len(),
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            collectors: 0,
            enabled_collectors: 0,
            errors: vec![e.to_string()],
        },
    }
}

/// Render the effective configuration, or one section of it, as TOML.
///
/// Collector secret keys are always redacted.
pub fn show(
    config_path: &Path,
    mut config: MirrorConfig,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    for collector in &mut config.collectors {
        collector.secret_key = REDACTED.to_owned();
    }

    let toml::Value::Table(mut table) = toml::Value::try_from(&config)
        .map_err(|e| CliError::Command(format!("failed to serialize configuration: {e}")))?
    else {
        return Err(CliError::Command(
            "configuration did not serialize to a table".to_owned(),
        ));
    };

    let table = match section {
        None => table,
        Some(name) => {
            if !SECTIONS.contains(&name) {
                return Err(CliError::Command(format!(
                    "unknown section: {} (expected: {})",
                    name,
                    SECTIONS.join(", ")
                )));
            }
            // 빈 수집기 목록은 직렬화 결과에 키가 없을 수 있음
            let value = table
                .remove(name)
                .unwrap_or_else(|| toml::Value::Array(Vec::new()));
            let mut single = toml::Table::new();
            single.insert(name.to_owned(), value);
            single
        }
    };

    let config_toml = toml::to_string_pretty(&table)
        .map_err(|e| CliError::Command(format!("failed to serialize configuration: {e}")))?;

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section: section.map(str::to_owned),
        config_toml,
    })
}

/// Effective configuration, already rendered as TOML.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.section {
            Some(section) => writeln!(
                w,
                "Configuration {} (source: {})",
                format!("[{section}]").bold(),
                self.source
            )?,
            None => writeln!(w, "Configuration (source: {})", self.source.bold())?,
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    pub collectors: usize,
    pub enabled_collectors: usize,
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
            writeln!(
                w,
                "  Collectors: {} ({} enabled)",
                self.collectors, self.enabled_collectors
            )?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
