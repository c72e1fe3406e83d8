use anyhow::Result;
use clap::Parser;
use cv_analyzer::cli::{handle_command, Cli};
use cv_analyzer::environment::EnvironmentConfig;
use std::fs::OpenOptions;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging first; user-facing output goes to stdout, the
    // JSON log to a file so it never interleaves with rendered results.
    let log_path =
        std::env::var("CVLENS_LOG").unwrap_or_else(|_| "/tmp/cvlens.log".to_string());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .expect("Failed to open log file");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive("info".parse().expect("Invalid log directive")),
        )
        .init();

    let cli = Cli::parse();

    let config = EnvironmentConfig::load()?;
    config.ensure_directories().await?;

    info!("API base URL: {}", config.api_base_url);
    info!("Output directory: {}", config.output_path.display());

    handle_command(cli, config).await
}
