//! Exporter configuration types.

use crate::GeoPoint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// (Host and) port to serve `/metrics` on, e.g. `:9654`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Make no more than this many OpenWeather calls per day, per location.
    #[serde(default = "default_daily_call_limit")]
    pub daily_call_limit: u32,

    /// OpenWeather API key.
    #[serde(default)]
    pub api_key: String,

    /// File containing the OpenWeather API key (used when `api_key` is empty).
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,

    /// OpenWeather API version selector ("2.5" or "3.0").
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Base URL override for the OpenWeather API.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Locations to collect, as `"lat,lng"`.
    #[serde(default)]
    pub locations: Vec<GeoPoint>,

    /// Upper bound on a single upstream request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Serve the previous reading without consulting the rate budget while
    /// it is younger than this.
    #[serde(default = "default_freshness_window")]
    pub freshness_window_secs: u64,
}

fn default_listen() -> String {
    ":9654".into()
}
fn default_daily_call_limit() -> u32 {
    1000
}
fn default_api_version() -> String {
    "2.5".into()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_freshness_window() -> u64 {
    10
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            daily_call_limit: default_daily_call_limit(),
            api_key: String::new(),
            api_key_file: None,
            api_version: default_api_version(),
            endpoint: None,
            locations: Vec::new(),
            request_timeout_secs: default_request_timeout(),
            freshness_window_secs: default_freshness_window(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: ExporterConfig = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.listen, ":9654");
        assert_eq!(config.daily_call_limit, 1000);
        assert_eq!(config.api_version, "2.5");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.freshness_window_secs, 10);
        assert!(config.locations.is_empty());
    }

    #[test]
    fn test_toml_locations_parse_as_geo_points() {
        let config: ExporterConfig = toml::from_str(
            r#"
            daily_call_limit = 500
            api_version = "3.0"
            locations = ["42.36,-71.06", "51.5, -0.12"]
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.daily_call_limit, 500);
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[1].key(), "51.500000,-0.120000");
    }

    #[test]
    fn test_toml_rejects_out_of_range_location() {
        let parsed = toml::from_str::<ExporterConfig>(r#"locations = ["100,0"]"#);
        assert!(parsed.is_err());
    }
}
