//! `logmirror patterns` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use logmirror_parse_engine::{CatalogLoader, MessagePattern, PatternRole, RuleCatalog};

use crate::cli::{PatternsAction, PatternsArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `patterns` command.
pub async fn execute(
    args: PatternsArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        PatternsAction::List { dir } => {
            let dir = super::resolve_pattern_dir(config_path, dir).await?;
            let report = list(&dir).await?;
            writer.render(&report)
        }
        PatternsAction::Validate { path } => {
            let report = validate(&path).await?;
            writer.render(&report)?;
            if !report.errors.is_empty() {
                return Err(CliError::Catalog(format!(
                    "{} problem(s) found in {}",
                    report.errors.len(),
                    path.display()
                )));
            }
            Ok(())
        }
    }
}

/// Load the catalog in `dir` and describe its active patterns in match order.
pub async fn list(dir: &Path) -> Result<PatternListReport, CliError> {
    info!(dir = %dir.display(), "loading message patterns");
    let catalog = CatalogLoader::load_directory(dir).await?;

    Ok(PatternListReport {
        dir: dir.display().to_string(),
        total: catalog.len(),
        patterns: catalog.patterns().iter().map(PatternEntry::from).collect(),
    })
}

/// Validate each file on its own, then the catalog as a whole.
///
/// Unlike loading, validation does not stop at the first bad file.
pub async fn validate(dir: &Path) -> Result<PatternValidationReport, CliError> {
    info!(dir = %dir.display(), "validating message patterns");
    let files = CatalogLoader::pattern_files(dir).await?;

    let mut patterns = Vec::with_capacity(files.len());
    let mut errors = Vec::new();
    for file in &files {
        match CatalogLoader::load_file(file).await {
            Ok(pattern) => patterns.push(pattern),
            Err(e) => errors.push(PatternError {
                file: file_name(file),
                error: e.to_string(),
            }),
        }
    }

    let valid = patterns.len();
    let mut active = 0;
    if errors.is_empty() {
        // 파일 간 규칙 (ID 중복, system_action 2개 이상)
        match RuleCatalog::from_patterns(patterns) {
            Ok(catalog) => active = catalog.len(),
            Err(e) => errors.push(PatternError {
                file: dir.display().to_string(),
                error: e.to_string(),
            }),
        }
    }

    Ok(PatternValidationReport {
        path: dir.display().to_string(),
        total_files: files.len(),
        valid,
        invalid: files.len() - valid,
        active,
        errors,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Serialize)]
pub struct PatternListReport {
    pub dir: String,
    pub total: usize,
    pub patterns: Vec<PatternEntry>,
}

#[derive(Debug, Serialize)]
pub struct PatternEntry {
    pub id: i64,
    pub name: String,
    pub priority: i32,
    pub role: PatternRole,
    pub fields: Vec<String>,
}

impl From<&MessagePattern> for PatternEntry {
    fn from(p: &MessagePattern) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            priority: p.priority,
            role: p.role,
            fields: p.fields.iter().map(|f| f.name.clone()).collect(),
        }
    }
}

impl Render for PatternListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Message Patterns ({} active, {})",
            self.total.to_string().bold(),
            self.dir
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<6} {:<30} {:<9} {:<14} Fields",
            "ID", "Name", "Priority", "Role"
        )?;
        writeln!(w, "{}", "-".repeat(90))?;

        for p in &self.patterns {
            let role = match p.role {
                PatternRole::SystemAction => "system_action".yellow(),
                PatternRole::Generic => "generic".normal(),
            };
            writeln!(
                w,
                "{:<6} {:<30} {:<9} {:<14} {}",
                p.id,
                p.name,
                p.priority,
                role,
                p.fields.join(", ")
            )?;
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct PatternValidationReport {
    pub path: String,
    pub total_files: usize,
    pub valid: usize,
    pub invalid: usize,
    pub active: usize,
    pub errors: Vec<PatternError>,
}

#[derive(Debug, Serialize)]
pub struct PatternError {
    pub file: String,
    pub error: String,
}

impl Render for PatternValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Pattern Validation: {}", self.path.bold())?;
        writeln!(
            w,
            "  Files: {} total, {} valid, {} invalid",
            self.total_files,
            self.valid.to_string().green(),
            if self.invalid > 0 {
                self.invalid.to_string().red()
            } else {
                self.invalid.to_string().normal()
            }
        )?;
        if self.errors.is_empty() {
            writeln!(w, "  Active patterns: {}", self.active)?;
        } else {
            writeln!(w)?;
            writeln!(w, "Errors:")?;
            for e in &self.errors {
                writeln!(w, "  {}: {}", e.file.red(), e.error)?;
            }
        }

        Ok(())
    }
}
