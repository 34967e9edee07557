//! Location-keyed set of collectors.

use crate::cached::CachedCollector;
use common::{Error, GeoPoint};
use governor::clock::{Clock, DefaultClock};
use openweather_client::WeatherSource;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// One [`CachedCollector`] per configured location, iterated in key order.
pub struct CollectorRegistry<S, C: Clock = DefaultClock> {
    collectors: BTreeMap<String, Arc<CachedCollector<S, C>>>,
}

impl<S: WeatherSource> CollectorRegistry<S> {
    /// Build a collector for each point, all sharing one upstream source.
    /// Every collector gets its own rate budget.
    pub fn build(
        points: &[GeoPoint],
        api_key: &str,
        source: Arc<S>,
        daily_limit: u32,
        freshness_window: Duration,
    ) -> Result<Self, Error> {
        let mut registry = Self::new();
        for point in points {
            let collector = CachedCollector::new(*point, api_key, source.clone(), daily_limit)?
                .with_freshness_window(freshness_window);
            registry.insert(collector)?;
        }
        Ok(registry)
    }
}

impl<S: WeatherSource, C: Clock> CollectorRegistry<S, C> {
    fn new() -> Self {
        Self {
            collectors: BTreeMap::new(),
        }
    }

    /// Add a collector. Two collectors for the same location would double the
    /// upstream call rate, so duplicates are rejected.
    pub fn insert(&mut self, collector: CachedCollector<S, C>) -> Result<(), Error> {
        let key = collector.location();
        if self.collectors.contains_key(&key) {
            return Err(Error::Config(format!("duplicate location {key}")));
        }
        self.collectors.insert(key, Arc::new(collector));
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<CachedCollector<S, C>>)> {
        self.collectors.iter().map(|(k, v)| (k.as_str(), v))
    }
}
