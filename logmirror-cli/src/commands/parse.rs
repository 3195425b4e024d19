//! `logmirror parse` command handler
//!
//! Runs the matcher and extractor over one message without touching storage.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use logmirror_parse_engine::{CatalogLoader, ParseEngine};

use crate::cli::ParseArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `parse` command.
pub async fn execute(
    args: ParseArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let dir = super::resolve_pattern_dir(config_path, args.patterns).await?;
    let catalog = CatalogLoader::load_directory(&dir).await?;
    let engine = ParseEngine::new(Arc::new(catalog))?;

    let report = analyze(&engine, &args.message);
    writer.render(&report)
}

/// Classify `message` with `engine`.
pub fn analyze(engine: &ParseEngine, message: &str) -> ParseReport {
    let mut report = ParseReport {
        message: message.to_owned(),
        matched: false,
        pattern_id: None,
        pattern_name: None,
        system_action: false,
        fields: Vec::new(),
        rejected: None,
    };

    match engine.analyze(message) {
        Ok(Some(analysis)) => {
            report.matched = true;
            report.pattern_id = Some(analysis.pattern_id);
            report.pattern_name = Some(analysis.pattern_name);
            report.system_action = analysis.system_action;
            report.fields = analysis
                .fields
                .iter()
                .map(|(name, value)| FieldValue {
                    name: name.to_owned(),
                    value: value.to_owned(),
                })
                .collect();
        }
        Ok(None) => {}
        Err(failure) => {
            report.matched = true;
            report.rejected = Some(failure.to_string());
        }
    }

    report
}

#[derive(Debug, Serialize)]
pub struct ParseReport {
    pub message: String,
    pub matched: bool,
    pub pattern_id: Option<i64>,
    pub pattern_name: Option<String>,
    pub system_action: bool,
    pub fields: Vec<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FieldValue {
    pub name: String,
    pub value: String,
}

impl Render for ParseReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Message: {}", self.message)?;

        if let Some(reason) = &self.rejected {
            writeln!(w, "Result:  {} ({})", "REJECTED".red().bold(), reason)?;
            return Ok(());
        }

        let (Some(id), Some(name)) = (self.pattern_id, &self.pattern_name) else {
            writeln!(w, "Result:  {}", "UNMATCHED".yellow())?;
            return Ok(());
        };

        let kind = if self.system_action {
            "system action"
        } else {
            "parsed"
        };
        writeln!(w, "Result:  {} ({})", "MATCHED".green().bold(), kind)?;
        writeln!(w, "Pattern: [{}] {}", id, name)?;
        if !self.fields.is_empty() {
            writeln!(w)?;
            let width = self.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
            for field in &self.fields {
                writeln!(w, "  {:<width$}  {}", field.name, field.value)?;
            }
        }

        Ok(())
    }
}
