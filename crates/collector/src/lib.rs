//! Rate-limited, cached weather collection.
//!
//! Wraps an upstream [`WeatherSource`](openweather_client::WeatherSource)
//! with a per-location call budget and last-good-reading fallback.

pub mod cached;
pub mod rate_limit;
pub mod registry;

pub use cached::{CachedCollector, CollectorState, SampleSource, DEFAULT_FRESHNESS_WINDOW};
pub use rate_limit::{interval_for, RateBudget};
pub use registry::CollectorRegistry;
