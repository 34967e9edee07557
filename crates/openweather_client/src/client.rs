//! HTTP fetcher for OpenWeather current conditions.

use crate::adapter::{decode_reading, ApiVersion};
use async_trait::async_trait;
use common::{Error, GeoPoint, Reading};
use std::time::Duration;
use tracing::{debug, warn};

/// Production OpenWeather host.
pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org";

/// Environment variable overriding [`DEFAULT_ENDPOINT`], mainly for tests.
pub const ENDPOINT_ENV: &str = "OPEN_WEATHER_ENDPOINT";

const ERROR_BODY_LIMIT: usize = 500;

/// Base URL from `OPEN_WEATHER_ENDPOINT`, or the production host.
pub fn endpoint_from_env() -> String {
    match std::env::var(ENDPOINT_ENV) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => DEFAULT_ENDPOINT.to_string(),
    }
}

/// Anything that can produce current conditions for a point.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Perform exactly one upstream lookup. Implementations never retry.
    async fn fetch_conditions(&self, point: GeoPoint, api_key: &str) -> Result<Reading, Error>;
}

/// OpenWeather API client bound to one API version and base URL.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    version: ApiVersion,
}

impl OpenWeatherClient {
    /// Client against the endpoint from the environment (or production).
    pub fn new(version: ApiVersion, timeout: Duration) -> Result<Self, Error> {
        Self::with_base_url(version, endpoint_from_env(), timeout)
    }

    pub fn with_base_url(
        version: ApiVersion,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("openweather-exporter/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build OpenWeather HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            version,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and decode current conditions for `point`.
    pub async fn get_conditions(&self, point: GeoPoint, api_key: &str) -> Result<Reading, Error> {
        let url = format!("{}{}", self.base_url, self.version.path());
        let query = self.version.query(point, api_key);

        debug!(
            "Calling OpenWeather {} API at {} for {}",
            self.version, url, point
        );

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                // The URL carries the API key.
                let e = e.without_url();
                warn!("Error calling OpenWeather for {}: {}", point, e);
                Error::Network(format!("HTTP error for {point}: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(Error::Network(format!(
                "OpenWeather returned {} for {}: {}",
                status.as_u16(),
                point,
                body
            )));
        }

        let payload = resp
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed reading body for {point}: {e}")))?;

        decode_reading(self.version, &payload).map_err(|e| {
            warn!(
                "Error decoding OpenWeather {} response for {}: {}",
                self.version, point, e
            );
            e
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch_conditions(&self, point: GeoPoint, api_key: &str) -> Result<Reading, Error> {
        self.get_conditions(point, api_key).await
    }
}
