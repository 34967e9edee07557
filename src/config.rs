//! Configuration loader. Merges .env, config.toml, environment and flags.

use clap::Parser;
use common::{Error, ExporterConfig, GeoPoint};
use openweather_client::ApiVersion;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Export OpenWeather current conditions as Prometheus metrics.
#[derive(Debug, Default, Parser)]
#[command(name = "openweather-exporter", version, about)]
pub struct Cli {
    /// TOML config file (config.toml is read if present).
    #[arg(long, env = "OPENWEATHER_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// (Host and) port to listen on for Prometheus export.
    #[arg(long, env = "OPENWEATHER_EXPORTER_LISTEN")]
    pub listen: Option<String>,

    /// Make no more than this many calls/day to OpenWeather per location
    /// (stale data is returned when sampled too quickly).
    #[arg(long = "daily-openweather-call-limit", env = "OPENWEATHER_DAILY_CALL_LIMIT")]
    pub daily_call_limit: Option<u32>,

    /// API key for OpenWeather.
    #[arg(long = "openweather-api-key", env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// File containing the API key for OpenWeather.
    #[arg(long = "openweather-api-key-file", env = "OPENWEATHER_API_KEY_FILE")]
    pub api_key_file: Option<PathBuf>,

    /// lat,lng to collect (repeatable).
    #[arg(
        long = "location",
        value_name = "LAT,LNG",
        env = "OPENWEATHER_LOCATIONS",
        value_delimiter = ';'
    )]
    pub locations: Vec<GeoPoint>,

    /// OpenWeather API version: 2.5 or 3.0.
    #[arg(long = "api-version", env = "OPENWEATHER_API_VERSION")]
    pub api_version: Option<String>,

    /// Upper bound on one OpenWeather request, in seconds.
    #[arg(long, env = "OPENWEATHER_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Reuse a reading younger than this without spending a call.
    #[arg(long, env = "OPENWEATHER_FRESHNESS_WINDOW_SECS")]
    pub freshness_window_secs: Option<u64>,

    /// Base URL of the OpenWeather API.
    #[arg(long = "openweather-endpoint", env = "OPEN_WEATHER_ENDPOINT")]
    pub endpoint: Option<String>,
}

/// Load a .env file from the working directory or its parents, so its
/// values are visible to flag parsing.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }
}

/// Build the effective configuration: defaults, then the TOML file, then
/// environment/flags (clap resolves those two together).
pub fn load_config(cli: &Cli) -> Result<ExporterConfig, Error> {
    let mut config = read_config_file(cli.config.as_deref())?;
    apply_overrides(&mut config, cli);
    resolve_api_key(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

fn read_config_file(explicit: Option<&Path>) -> Result<ExporterConfig, Error> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(ExporterConfig::default());
            }
            default
        }
    };

    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

fn apply_overrides(config: &mut ExporterConfig, cli: &Cli) {
    if let Some(listen) = &cli.listen {
        config.listen = listen.clone();
    }
    if let Some(limit) = cli.daily_call_limit {
        config.daily_call_limit = limit;
    }
    if let Some(key) = &cli.api_key {
        config.api_key = key.clone();
    }
    if let Some(path) = &cli.api_key_file {
        config.api_key_file = Some(path.clone());
        // A key file given on the command line beats a key from config.toml.
        if cli.api_key.is_none() {
            config.api_key.clear();
        }
    }
    if !cli.locations.is_empty() {
        config.locations = cli.locations.clone();
    }
    if let Some(version) = &cli.api_version {
        config.api_version = version.clone();
    }
    if let Some(secs) = cli.request_timeout_secs {
        config.request_timeout_secs = secs;
    }
    if let Some(secs) = cli.freshness_window_secs {
        config.freshness_window_secs = secs;
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
}

/// An explicit key wins; otherwise read it from the key file, trimmed.
fn resolve_api_key(config: &mut ExporterConfig) -> Result<(), Error> {
    if !config.api_key.trim().is_empty() {
        config.api_key = config.api_key.trim().to_string();
        return Ok(());
    }
    if let Some(path) = &config.api_key_file {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Error reading OpenWeather key from {}: {}",
                path.display(),
                e
            ))
        })?;
        config.api_key = raw.trim().to_string();
    }
    Ok(())
}

/// Resolve the listen address. A bare `:port` binds every interface.
pub fn listen_addr(listen: &str) -> Result<SocketAddr, Error> {
    let listen = listen.trim();
    let candidate = if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_string()
    };

    candidate
        .to_socket_addrs()
        .map_err(|e| Error::Config(format!("invalid listen address {listen:?}: {e}")))?
        .next()
        .ok_or_else(|| Error::Config(format!("listen address {listen:?} resolved to nothing")))
}

fn validate_config(config: &ExporterConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.locations.is_empty() {
        issues.push("at least one --location is required".into());
    }
    if config.api_key.is_empty() {
        issues.push(
            "one of --openweather-api-key or --openweather-api-key-file is required".into(),
        );
    }
    if let Err(e) = collector::interval_for(config.daily_call_limit) {
        issues.push(config_issue(e));
    }
    if let Err(e) = config.api_version.parse::<ApiVersion>() {
        issues.push(e.to_string());
    }
    if config.request_timeout_secs == 0 {
        issues.push("request_timeout_secs must be > 0".into());
    }
    if let Some(endpoint) = &config.endpoint {
        match url::Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => issues.push(format!(
                "endpoint must be http or https (got {:?})",
                url.scheme()
            )),
            Err(e) => issues.push(format!("invalid endpoint {endpoint:?}: {e}")),
        }
    }
    if let Err(e) = listen_addr(&config.listen) {
        issues.push(config_issue(e));
    }

    let mut seen = std::collections::HashSet::new();
    for point in &config.locations {
        if !seen.insert(point.key()) {
            issues.push(format!("duplicate location {point}"));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

fn config_issue(e: Error) -> String {
    match e {
        Error::Config(msg) => msg,
        other => other.to_string(),
    }
}
