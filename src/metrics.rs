//! Prometheus metrics for collected weather.

use collector::SampleSource;
use common::{Error, Reading};
use prometheus::{
    register_gauge_vec_with_registry, register_int_counter_vec_with_registry, Encoder, GaugeVec,
    IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "weather";

/// Per-location weather gauges plus a collection outcome counter.
pub struct ExporterMetrics {
    temperature: GaugeVec,
    pressure: GaugeVec,
    humidity: GaugeVec,
    wind_speed: GaugeVec,
    wind_direction: GaugeVec,
    cloud_cover: GaugeVec,
    collections_total: IntCounterVec,
    registry: Registry,
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec, Error> {
    register_gauge_vec_with_registry!(
        Opts::new(name, help).namespace(NAMESPACE),
        &["location"],
        registry
    )
    .map_err(|e| Error::Config(format!("failed to register {NAMESPACE}_{name}: {e}")))
}

impl ExporterMetrics {
    pub fn new() -> Result<Self, Error> {
        let registry = Registry::new();

        let temperature = gauge(
            &registry,
            "temperature_celsius",
            "Current local temperature, in °C",
        )?;
        let pressure = gauge(
            &registry,
            "pressure_hpa",
            "Current local atmospheric pressure (hectopascals)",
        )?;
        let humidity = gauge(&registry, "humidity", "Current local humidity")?;
        let wind_speed = gauge(
            &registry,
            "wind_speed_meters_per_sec",
            "Current local wind speed, in meters/sec",
        )?;
        let wind_direction = gauge(
            &registry,
            "wind_direction_degrees",
            "Current local wind direction, in degrees from 0° (North)",
        )?;
        let cloud_cover = gauge(
            &registry,
            "cloud_cover_percent",
            "Current local cloud cover, in percent",
        )?;

        let collections_total = register_int_counter_vec_with_registry!(
            Opts::new(
                "collections_total",
                "Samples taken per location by outcome (fresh, cached, stale, error)"
            )
            .namespace(NAMESPACE),
            &["location", "outcome"],
            registry
        )
        .map_err(|e| Error::Config(format!("failed to register collections counter: {e}")))?;

        Ok(Self {
            temperature,
            pressure,
            humidity,
            wind_speed,
            wind_direction,
            cloud_cover,
            collections_total,
            registry,
        })
    }

    /// Record one sample. A failed sample reports NaN for every gauge of
    /// that location.
    pub fn observe(&self, location: &str, outcome: &Result<(Reading, SampleSource), Error>) {
        let (reading, label) = match outcome {
            Ok((reading, source)) => (*reading, source.as_str()),
            Err(_) => (Reading::unavailable(), "error"),
        };

        self.set(location, &reading);
        self.collections_total
            .with_label_values(&[location, label])
            .inc();
    }

    fn set(&self, location: &str, reading: &Reading) {
        let labels = &[location];
        self.temperature
            .with_label_values(labels)
            .set(reading.temperature);
        self.pressure.with_label_values(labels).set(reading.pressure);
        self.humidity.with_label_values(labels).set(reading.humidity);
        self.wind_speed
            .with_label_values(labels)
            .set(reading.wind_speed);
        self.wind_direction
            .with_label_values(labels)
            .set(reading.wind_direction);
        self.cloud_cover
            .with_label_values(labels)
            .set(reading.cloud_cover);
    }

    /// Render everything in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        String::from_utf8(buffer).map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCATION: &str = "37.390000,-122.080000";

    fn reading() -> Reading {
        Reading {
            temperature: 20.24,
            pressure: 1016.0,
            humidity: 59.0,
            wind_speed: 4.63,
            wind_direction: 320.0,
            cloud_cover: 75.0,
        }
    }

    #[test]
    fn test_successful_sample_sets_gauges() {
        let metrics = ExporterMetrics::new().expect("metrics should register");
        metrics.observe(LOCATION, &Ok((reading(), SampleSource::Fresh)));

        let text = metrics.encode().expect("encode");
        assert!(text.contains(&format!(
            "weather_temperature_celsius{{location=\"{LOCATION}\"}} 20.24"
        )));
        assert!(text.contains(&format!(
            "weather_pressure_hpa{{location=\"{LOCATION}\"}} 1016"
        )));
        assert!(text.contains(&format!(
            "weather_wind_direction_degrees{{location=\"{LOCATION}\"}} 320"
        )));
        assert!(text.contains(&format!(
            "weather_cloud_cover_percent{{location=\"{LOCATION}\"}} 75"
        )));
        assert!(text.contains(&format!(
            "weather_collections_total{{location=\"{LOCATION}\",outcome=\"fresh\"}} 1"
        )));
        assert!(text.contains("# HELP weather_humidity Current local humidity"));
    }

    #[test]
    fn test_failed_sample_reports_nan() {
        let metrics = ExporterMetrics::new().expect("metrics should register");
        metrics.observe(LOCATION, &Ok((reading(), SampleSource::Fresh)));
        metrics.observe(LOCATION, &Err(Error::RateLimitedNoData));

        let text = metrics.encode().expect("encode");
        for name in [
            "temperature_celsius",
            "pressure_hpa",
            "humidity",
            "wind_speed_meters_per_sec",
            "wind_direction_degrees",
            "cloud_cover_percent",
        ] {
            assert!(
                text.contains(&format!("weather_{name}{{location=\"{LOCATION}\"}} NaN")),
                "{name} should be NaN:\n{text}"
            );
        }
        assert!(text.contains(&format!(
            "weather_collections_total{{location=\"{LOCATION}\",outcome=\"error\"}} 1"
        )));
    }

    #[test]
    fn test_outcomes_counted_separately() {
        let metrics = ExporterMetrics::new().expect("metrics should register");
        metrics.observe(LOCATION, &Ok((reading(), SampleSource::Fresh)));
        metrics.observe(LOCATION, &Ok((reading(), SampleSource::Cached)));
        metrics.observe(LOCATION, &Ok((reading(), SampleSource::Cached)));
        metrics.observe(LOCATION, &Ok((reading(), SampleSource::Stale)));

        let text = metrics.encode().expect("encode");
        assert!(text.contains("outcome=\"cached\"} 2"));
        assert!(text.contains("outcome=\"stale\"} 1"));
    }
}
