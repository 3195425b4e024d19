use clap::Parser;
use tracing_subscriber::EnvFilter;

use logmirror_cli::cli::{Cli, Commands};
use logmirror_cli::commands;
use logmirror_cli::error::CliError;
use logmirror_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.log_level.as_deref());

    if let Err(e) = dispatch(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_path();

    match cli.command {
        Commands::Patterns(args) => commands::patterns::execute(args, config_path, &writer).await,
        Commands::Parse(args) => commands::parse::execute(args, config_path, &writer).await,
        Commands::Fetch(args) => commands::fetch::execute(args, config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}

/// Logs go to stderr so that `--output json` stays machine-readable.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
