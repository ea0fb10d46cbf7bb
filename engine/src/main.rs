// Facturo invoice engine
// Main entry point for the facturo binary

use clap::Parser;
use facturo_engine::cli::{Cli, Command};
use facturo_engine::config::Config;
use facturo_engine::handlers::{
    ensure_submit_configured, handle_config, handle_dictate, handle_key, handle_replay,
    handle_scan, OutputFormat,
};
use facturo_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over core.log_level; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Facturo v{} ({} - {})", version, commit, timestamp);

    // Handle commands
    match cli.command {
        Command::Dictate { output, submit } => {
            ensure_submit_configured(&config, submit)?;
            tracing::info!("Starting dictation session");
            handle_dictate(&config, format, output, submit).await
        }

        Command::Scan {
            images,
            output,
            submit,
        } => {
            ensure_submit_configured(&config, submit)?;
            tracing::info!("Scanning {} image(s)", images.len());
            handle_scan(&config, format, images, output, submit).await
        }

        Command::Replay { file } => handle_replay(file, &config, format).await,

        Command::Key { action } => handle_key(action, &config, format).await,

        Command::Config { action } => {
            handle_config(action, &config, cli.config.as_deref(), format).await
        }
    }
}
