//! openweather-exporter: OpenWeather current conditions as Prometheus metrics.
//!
//! Single-binary Tokio application that:
//! 1. Loads locations and credentials from flags, env and config.toml
//! 2. Builds one rate-limited, cached collector per location
//! 3. Serves `/metrics`, sampling every location on each scrape

mod config;
mod metrics;
mod server;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use collector::CollectorRegistry;
use common::{Error, ExporterConfig};
use metrics::ExporterMetrics;
use openweather_client::{ApiVersion, OpenWeatherClient};
use server::AppState;

/// Exit status for bad flags or configuration.
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "openweather_exporter=info,openweather_client=info,collector=info".into()
            }),
        )
        .with_target(true)
        .init();

    config::load_dotenv();
    let cli = config::Cli::parse();

    info!("OpenWeather exporter starting up...");

    let cfg = match config::load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(e) = run(cfg).await {
        error!("{}", e);
        std::process::exit(if e.is_config() { EXIT_CONFIG } else { 1 });
    }
}

async fn run(cfg: ExporterConfig) -> Result<(), Error> {
    let version: ApiVersion = cfg.api_version.parse()?;
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let client = match &cfg.endpoint {
        Some(endpoint) => OpenWeatherClient::with_base_url(version, endpoint.as_str(), timeout)?,
        None => OpenWeatherClient::new(version, timeout)?,
    };

    info!(
        "OpenWeather {} API at {}, {} calls/day per location",
        version,
        client.base_url(),
        cfg.daily_call_limit
    );
    info!(
        "Locations: {:?}",
        cfg.locations.iter().map(|p| p.key()).collect::<Vec<_>>()
    );

    let collectors = CollectorRegistry::build(
        &cfg.locations,
        &cfg.api_key,
        Arc::new(client),
        cfg.daily_call_limit,
        Duration::from_secs(cfg.freshness_window_secs),
    )?;

    let addr = config::listen_addr(&cfg.listen)?;
    let state = AppState::new(collectors, ExporterMetrics::new()?);
    server::run(state, addr).await
}
