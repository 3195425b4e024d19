//! Daemon assembly and the periodic ingestion loop.
//!
//! The [`Daemon`] loads the pattern catalog once, opens the configured store,
//! builds the HTTP collector client and wires them into an [`Ingestor`].
//!
//! # Scheduling
//!
//! A pass over every enabled collector runs every `ingest.poll_interval_secs`.
//! On shutdown no new pass is scheduled; a pass already running is allowed
//! to finish so that checkpoints always match what was stored.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::time::MissedTickBehavior;

use logmirror_core::config::MirrorConfig;
use logmirror_core::metrics as m;
use logmirror_ingest::{HttpCollectorClient, Ingestor, RunSummary};
use logmirror_parse_engine::{CatalogLoader, ParseEngine, RuleCatalog};
use logmirror_storage::StoreBackend;

use crate::metrics_server;

/// Ingestor type used by the daemon.
pub type DaemonIngestor = Ingestor<HttpCollectorClient, StoreBackend>;

/// The assembled daemon.
pub struct Daemon {
    config: MirrorConfig,
    ingestor: DaemonIngestor,
    start_time: Instant,
}

impl Daemon {
    /// Load configuration from `config_path` and build the daemon.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = MirrorConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// Installs the metrics recorder when `[metrics] enabled = true`.
    pub async fn build_from_config(config: MirrorConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION"))
                .set(1.0);
        }

        let catalog = load_catalog(&config).await?;
        let engine = ParseEngine::new(Arc::new(catalog))
            .map_err(|e| anyhow::anyhow!("failed to compile pattern catalog: {}", e))?;

        let store = StoreBackend::open(&config.storage, &config.quota)
            .map_err(|e| anyhow::anyhow!("failed to open {} store: {}", config.storage.backend, e))?;
        tracing::info!(
            backend = store.name(),
            max_logs_per_device = config.quota.max_logs_per_device,
            "store opened"
        );

        let client =
            HttpCollectorClient::new(Duration::from_secs(config.ingest.fetch_timeout_secs))?;

        let ingestor = Ingestor::builder()
            .client(client)
            .store(Arc::new(store))
            .engine(Arc::new(engine))
            .max_concurrent_collectors(config.ingest.max_concurrent_collectors)
            .build()?;

        tracing::info!(
            collectors = config.active_collectors().len(),
            poll_interval_secs = config.ingest.poll_interval_secs,
            "daemon initialized"
        );

        Ok(Self {
            config,
            ingestor,
            start_time: Instant::now(),
        })
    }

    /// Run one pass over all enabled collectors.
    pub async fn run_once(&self) -> RunSummary {
        let summary = self.ingestor.run_pass(&self.config.collectors).await;
        if self.config.metrics.enabled {
            metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                .set(self.start_time.elapsed().as_secs_f64());
        }
        summary
    }

    /// Run passes every `poll_interval_secs` until `shutdown` completes.
    ///
    /// Returns the number of completed passes.
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let period = Duration::from_secs(self.config.ingest.poll_interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);
        let mut passes = 0u64;
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!(passes, "shutdown requested, no further passes scheduled");
                    break;
                }
                _ = ticker.tick() => {
                    let summary = self.run_once().await;
                    passes += 1;
                    if !summary.failures.is_empty() {
                        tracing::warn!(
                            run_id = %summary.run_id,
                            failed_collectors = summary.failures.len(),
                            "pass finished with collector failures"
                        );
                    }
                }
            }
        }
        passes
    }

    /// Run until SIGTERM or SIGINT.
    pub async fn run(&self) -> Result<()> {
        let signal = wait_for_shutdown_signal()?;
        tracing::info!("entering ingestion loop");
        self.run_until(async move {
            let name = signal.await;
            tracing::info!(signal = name, "shutdown signal received");
        })
        .await;
        Ok(())
    }

    /// Loaded configuration.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Underlying ingestor (store and engine access).
    pub fn ingestor(&self) -> &DaemonIngestor {
        &self.ingestor
    }
}

/// Load the pattern catalog named by `[catalog] pattern_dir`.
pub async fn load_catalog(config: &MirrorConfig) -> Result<RuleCatalog> {
    CatalogLoader::load_directory(&config.catalog.pattern_dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load pattern catalog: {}", e))
}

/// Validate configuration and pattern catalog without touching storage.
///
/// Returns the number of active patterns.
pub async fn validate(config: &MirrorConfig) -> Result<usize> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    let catalog = load_catalog(config).await?;
    ParseEngine::new(Arc::new(catalog))
        .map(|engine| engine.catalog().len())
        .map_err(|e| anyhow::anyhow!("failed to compile pattern catalog: {}", e))
}

/// Install SIGTERM and SIGINT handlers.
///
/// Handlers are installed eagerly so a signal arriving during the first pass
/// is not lost. The returned future resolves with the signal name.
fn wait_for_shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}
