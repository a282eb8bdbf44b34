pub mod cache;
pub mod cli;
pub mod clients;
pub mod config;
pub mod credentials;
pub mod models;
pub mod services;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
pub use config::Config;
use config::ObservabilityConfig;
pub use services::research::{ResearchError, ResearchReport, Researcher};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    // stdout carries the research payload
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    let prometheus_handle = if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    let result = cli::dispatch(cli, &config).await;

    if let Some(handle) = prometheus_handle {
        write_metrics(&handle, &config.observability)?;
    }
    result
}

fn write_metrics(handle: &PrometheusHandle, config: &ObservabilityConfig) -> anyhow::Result<()> {
    let rendered = handle.render();
    match &config.metrics_file {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write metrics to {}", path.display())),
        None => {
            eprint!("{rendered}");
            Ok(())
        }
    }
}
