//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose the `/metrics` scrape endpoint.

use std::net::SocketAddr;

use anyhow::Result;
use logmirror_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global metrics recorder and start the HTTP listener.
///
/// This function should be called once per process. After it returns, all
/// `metrics::counter!()`, `metrics::gauge!()`, `metrics::histogram!()` calls
/// are exported in Prometheus format.
///
/// # Errors
///
/// - The listen address is invalid
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    logmirror_core::metrics::describe_all();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}

fn listen_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}
