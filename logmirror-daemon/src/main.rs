use anyhow::Result;
use clap::Parser;

use logmirror_core::config::MirrorConfig;
use logmirror_daemon::{logging, runner};

mod cli;

use cli::DaemonCli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonCli::parse();

    let mut config = MirrorConfig::load(&args.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", args.config.display(), e))?;

    // CLI flags win over file and environment
    if let Some(level) = args.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.general.log_format = format;
    }

    if args.validate {
        let patterns = runner::validate(&config).await?;
        println!(
            "configuration OK: {} collector(s), {} active pattern(s)",
            config.active_collectors().len(),
            patterns
        );
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        config = %args.config.display(),
        version = env!("CARGO_PKG_VERSION"),
        "logmirror-daemon starting"
    );

    let daemon = runner::Daemon::build_from_config(config).await?;

    if args.once {
        let summary = daemon.run_once().await;
        tracing::info!(
            run_id = %summary.run_id,
            stored = summary.stored(),
            collector_failures = summary.failures.len(),
            "single pass complete"
        );
        if !summary.failures.is_empty() {
            return Err(anyhow::anyhow!(
                "{} collector(s) failed during the pass",
                summary.failures.len()
            ));
        }
        return Ok(());
    }

    daemon.run().await?;
    tracing::info!("logmirror-daemon shut down");
    Ok(())
}
