//! HTTP surface: `/metrics` plus a pointer page at `/`.

use crate::metrics::ExporterMetrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use collector::CollectorRegistry;
use common::Error;
use futures_util::future::join_all;
use openweather_client::WeatherSource;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers.
pub struct AppState<S> {
    collectors: CollectorRegistry<S>,
    metrics: ExporterMetrics,
    // Gauges are shared, so concurrent scrapes must not interleave
    // set-then-encode.
    render_lock: Mutex<()>,
}

impl<S: WeatherSource> AppState<S> {
    pub fn new(collectors: CollectorRegistry<S>, metrics: ExporterMetrics) -> Self {
        Self {
            collectors,
            metrics,
            render_lock: Mutex::new(()),
        }
    }

    /// Sample every location and render the exposition text.
    ///
    /// Locations are sampled concurrently; each is serialized by its own
    /// collector lock.
    pub async fn render(&self) -> Result<String, Error> {
        let _guard = self.render_lock.lock().await;

        let samples = join_all(self.collectors.iter().map(|(location, collector)| async move {
            let outcome = collector.sample_traced().await;
            (location, outcome, collector.state().await)
        }))
        .await;

        for (location, outcome, state) in &samples {
            if let Err(e) = outcome {
                warn!("Error collecting weather for {} ({:?}): {}", location, state, e);
            }
            self.metrics.observe(location, outcome);
        }

        self.metrics.encode()
    }
}

pub fn router<S: WeatherSource + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics_handler::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn index() -> &'static str {
    "OpenWeather Exporter\n\nMetrics are served at /metrics\n"
}

async fn metrics_handler<S: WeatherSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Response {
    match state.render().await {
        Ok(body) => (
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve until the process is stopped.
pub async fn run<S: WeatherSource + 'static>(state: AppState<S>, addr: SocketAddr) -> Result<(), Error> {
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}/metrics", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{GeoPoint, Reading};
    use std::time::Duration;

    const GOOD: &str = "37.390000,-122.080000";
    const BAD: &str = "-33.860000,151.200000";

    /// Succeeds for one location and fails for every other.
    struct OneGoodLocation;

    #[async_trait]
    impl WeatherSource for OneGoodLocation {
        async fn fetch_conditions(&self, point: GeoPoint, _api_key: &str) -> Result<Reading, Error> {
            if point.key() == GOOD {
                Ok(Reading {
                    temperature: 20.24,
                    pressure: 1016.0,
                    humidity: 59.0,
                    wind_speed: 4.63,
                    wind_direction: 320.0,
                    cloud_cover: 75.0,
                })
            } else {
                Err(Error::Network("OpenWeather returned 401".into()))
            }
        }
    }

    fn state() -> AppState<OneGoodLocation> {
        let points: Vec<GeoPoint> = [GOOD, BAD]
            .iter()
            .map(|s| s.parse().expect("valid point"))
            .collect();
        let collectors = CollectorRegistry::build(
            &points,
            "key",
            Arc::new(OneGoodLocation),
            1000,
            Duration::from_secs(10),
        )
        .expect("registry should build");
        AppState::new(collectors, ExporterMetrics::new().expect("metrics"))
    }

    #[tokio::test]
    async fn test_render_reports_each_location() {
        let state = state();
        let text = state.render().await.expect("render");

        assert!(text.contains(&format!(
            "weather_temperature_celsius{{location=\"{GOOD}\"}} 20.24"
        )));
        assert!(text.contains(&format!(
            "weather_temperature_celsius{{location=\"{BAD}\"}} NaN"
        )));
        assert!(text.contains(&format!(
            "weather_collections_total{{location=\"{BAD}\",outcome=\"error\"}} 1"
        )));
    }

    #[tokio::test]
    async fn test_second_scrape_is_served_from_cache() {
        let state = state();
        state.render().await.expect("first render");
        let text = state.render().await.expect("second render");

        assert!(text.contains(&format!(
            "weather_collections_total{{location=\"{GOOD}\",outcome=\"cached\"}} 1"
        )));
        // The failed location spent its only token and has nothing cached.
        assert!(text.contains(&format!(
            "weather_collections_total{{location=\"{BAD}\",outcome=\"error\"}} 2"
        )));
    }

    #[tokio::test]
    async fn test_metrics_handler_sets_content_type() {
        let response = metrics_handler(State(Arc::new(state()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_index_points_to_metrics() {
        assert!(index().await.contains("/metrics"));
    }
}
