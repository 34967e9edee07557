//! Unified error type for the exporter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("OpenWeather request failed: {0}")]
    Network(String),

    #[error("Failed to decode OpenWeather response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unsupported API version {0:?}")]
    UnsupportedApiVersion(String),

    #[error("rate limited, no previous data available")]
    RateLimitedNoData,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Configuration errors are fatal at startup; everything else is a
    /// per-scrape collection failure.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::UnsupportedApiVersion(_))
    }
}
