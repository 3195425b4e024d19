//! `logmirror fetch` command handler
//!
//! Runs exactly one ingestion pass, the same way the daemon does on each tick.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use logmirror_core::config::{CollectorConfig, MirrorConfig};
use logmirror_ingest::{HttpCollectorClient, Ingestor, RunSummary};
use logmirror_parse_engine::{CatalogLoader, ParseEngine};
use logmirror_storage::{MemoryStore, StoreBackend};

use crate::cli::FetchArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `fetch` command.
pub async fn execute(
    args: FetchArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = MirrorConfig::load(config_path).await?;
    let report = run(&config, &args).await?;
    writer.render(&report)?;

    if !report.summary.failures.is_empty() {
        return Err(CliError::Fetch(format!(
            "{} collector(s) failed",
            report.summary.failures.len()
        )));
    }
    Ok(())
}

/// Build an ingestor from `config` and run one pass.
pub async fn run(config: &MirrorConfig, args: &FetchArgs) -> Result<FetchReport, CliError> {
    let collectors = select_collectors(config, args.collector)?;

    let catalog = CatalogLoader::load_directory(&config.catalog.pattern_dir).await?;
    let engine = ParseEngine::new(Arc::new(catalog))?;

    let store = if args.dry_run {
        StoreBackend::Memory(MemoryStore::new().with_quota(config.quota.max_logs_per_device))
    } else {
        StoreBackend::open(&config.storage, &config.quota)?
    };
    let backend = store.name();

    let client = HttpCollectorClient::new(Duration::from_secs(config.ingest.fetch_timeout_secs))?;
    let ingestor = Ingestor::builder()
        .client(client)
        .store(Arc::new(store))
        .engine(Arc::new(engine))
        .max_concurrent_collectors(config.ingest.max_concurrent_collectors)
        .build()?;

    info!(
        collectors = collectors.len(),
        backend,
        dry_run = args.dry_run,
        "running single ingestion pass"
    );
    let summary = ingestor.run_pass(&collectors).await;

    Ok(FetchReport {
        dry_run: args.dry_run,
        backend,
        summary,
    })
}

fn select_collectors(
    config: &MirrorConfig,
    only: Option<i64>,
) -> Result<Vec<CollectorConfig>, CliError> {
    match only {
        None => Ok(config.collectors.clone()),
        Some(id) => {
            let selected: Vec<_> = config
                .collectors
                .iter()
                .filter(|c| c.id == id)
                .cloned()
                .collect();
            if selected.is_empty() {
                return Err(CliError::Config(format!(
                    "no collector with id {id} in configuration"
                )));
            }
            Ok(selected)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FetchReport {
    pub dry_run: bool,
    pub backend: &'static str,
    #[serde(flatten)]
    pub summary: RunSummary,
}

impl Render for FetchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let s = &self.summary;
        write!(w, "Ingestion pass {}", s.run_id.to_string().bold())?;
        if self.dry_run {
            write!(w, " {}", "(dry run)".yellow())?;
        }
        writeln!(w)?;
        writeln!(w, "  Store:    {}", self.backend)?;
        writeln!(w, "  Elapsed:  {} ms", s.elapsed_ms())?;
        writeln!(w)?;

        writeln!(
            w,
            "{:<6} {:<24} {:>10} {:>10} {:>8} {:>8} {:>8} {:>9} {:>8}",
            "ID", "Collector", "Before", "After", "Fetched", "Stored", "Parsed", "Unmatched", "Skipped"
        )?;
        writeln!(w, "{}", "-".repeat(100))?;
        for c in &s.collectors {
            writeln!(
                w,
                "{:<6} {:<24} {:>10} {:>10} {:>8} {:>8} {:>8} {:>9} {:>8}",
                c.collector_id,
                c.collector_name,
                c.checkpoint_before,
                c.checkpoint_after,
                c.fetched,
                c.stored,
                c.parsed,
                c.unmatched,
                c.quota_skipped
            )?;
        }
        writeln!(w)?;
        writeln!(
            w,
            "Total: {} fetched, {} stored, {} parsed ({} system actions), {} unmatched, {} rejected",
            s.fetched(),
            s.stored(),
            s.parsed(),
            s.system_actions(),
            s.unmatched(),
            s.rejected()
        )?;

        if s.record_failures() > 0 {
            writeln!(w, "{}", format!("{} record(s) failed", s.record_failures()).red())?;
        }
        if !s.failures.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", "Failed collectors:".red().bold())?;
            for f in &s.failures {
                writeln!(w, "  [{}] {}: {}", f.collector_id, f.collector_name, f.reason)?;
            }
        }

        Ok(())
    }
}
