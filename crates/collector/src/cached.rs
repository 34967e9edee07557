//! Per-location cached collector.
//!
//! Each scrape asks for a reading. A reading younger than the freshness
//! window is served as-is without touching the rate budget. Otherwise one
//! token is spent on an upstream call; when no token is available the last
//! good reading is served indefinitely. A failed call never discards the
//! previous reading.

use crate::rate_limit::RateBudget;
use common::{Error, GeoPoint, Reading};
use governor::clock::{Clock, DefaultClock};
use openweather_client::WeatherSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Readings younger than this are served without consulting the budget.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(10);

/// Where the collector stands with respect to its last reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// No successful fetch yet.
    ColdStart,
    /// Serving a reading obtained within budget.
    Cached,
    /// Budget exhausted, serving the last good reading.
    StaleFallback,
}

/// How a sampled reading was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSource {
    /// Fetched upstream during this sample.
    Fresh,
    /// Reused within the freshness window.
    Cached,
    /// Reused because the budget denied a fetch.
    Stale,
}

impl SampleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleSource::Fresh => "fresh",
            SampleSource::Cached => "cached",
            SampleSource::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LastReading {
    reading: Reading,
    fetched_at: Instant,
}

#[derive(Debug)]
struct Inner {
    last: Option<LastReading>,
    state: CollectorState,
}

impl Inner {
    fn fresh_reading(&self, window: Duration) -> Option<Reading> {
        self.last
            .filter(|last| last.fetched_at.elapsed() < window)
            .map(|last| last.reading)
    }
}

/// Collector for a single location.
///
/// Samples are serialized through an async mutex held across the upstream
/// call, so concurrent scrapes of the same location never fetch twice.
pub struct CachedCollector<S, C: Clock = DefaultClock> {
    point: GeoPoint,
    api_key: String,
    source: Arc<S>,
    budget: RateBudget<C>,
    freshness_window: Duration,
    inner: Mutex<Inner>,
}

impl<S: WeatherSource> CachedCollector<S> {
    pub fn new(
        point: GeoPoint,
        api_key: impl Into<String>,
        source: Arc<S>,
        daily_limit: u32,
    ) -> Result<Self, Error> {
        let budget = RateBudget::from_daily_limit(daily_limit)?;
        Ok(Self::with_budget(point, api_key, source, budget))
    }
}

impl<S: WeatherSource, C: Clock> CachedCollector<S, C> {
    pub fn with_budget(
        point: GeoPoint,
        api_key: impl Into<String>,
        source: Arc<S>,
        budget: RateBudget<C>,
    ) -> Self {
        Self {
            point,
            api_key: api_key.into(),
            source,
            budget,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            inner: Mutex::new(Inner {
                last: None,
                state: CollectorState::ColdStart,
            }),
        }
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    /// Registry key and metric label for this collector.
    pub fn location(&self) -> String {
        self.point.key()
    }

    pub async fn state(&self) -> CollectorState {
        self.inner.lock().await.state
    }

    /// Produce a reading for this location, fetching upstream only when the
    /// previous one is too old and the budget allows it.
    pub async fn sample(&self) -> Result<Reading, Error> {
        self.sample_traced().await.map(|(reading, _)| reading)
    }

    /// Like [`sample`](Self::sample), also reporting how the reading was obtained.
    pub async fn sample_traced(&self) -> Result<(Reading, SampleSource), Error> {
        let mut inner = self.inner.lock().await;

        if let Some(reading) = inner.fresh_reading(self.freshness_window) {
            debug!("{}: serving reading inside freshness window", self.point);
            inner.state = CollectorState::Cached;
            return Ok((reading, SampleSource::Cached));
        }

        if !self.budget.admit() {
            let previous = inner.last.map(|last| last.reading);
            return match previous {
                Some(reading) => {
                    debug!("{}: rate limited, serving previous reading", self.point);
                    inner.state = CollectorState::StaleFallback;
                    Ok((reading, SampleSource::Stale))
                }
                None => {
                    warn!("{}: rate limited with no previous reading", self.point);
                    Err(Error::RateLimitedNoData)
                }
            };
        }

        debug!("{}: under rate limit, calling OpenWeather", self.point);
        let started = Instant::now();
        let reading = self
            .source
            .fetch_conditions(self.point, &self.api_key)
            .await?;

        inner.last = Some(LastReading {
            reading,
            fetched_at: started,
        });
        inner.state = CollectorState::Cached;

        info!(
            "{}: {:.1}°C, {:.0}% humidity, wind {} at {:.1} m/s ({:?})",
            self.point,
            reading.temperature,
            reading.humidity,
            reading.wind_compass(),
            reading.wind_speed,
            started.elapsed()
        );

        Ok((reading, SampleSource::Fresh))
    }
}
