//! Domain types shared across the exporter.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Locations ─────────────────────────────────────────────────────────

/// A geographic point to collect weather for.
///
/// The `Display` form (`"lat,lng"`, six decimals) is the point's identity:
/// it keys the collector registry and becomes the `location` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(lat: f64, lng: f64) -> Result<Self, Error> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(Error::Config(format!(
                "Unparseable latitude or longitude {lat},{lng}"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(Error::Config(format!(
                "Out of range latitude or longitude {lat},{lng}"
            )));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Identity string used as a map key and metric label.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

impl FromStr for GeoPoint {
    type Err = Error;

    /// Parse `"lat,lng"`, tolerating whitespace around each component.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let unparseable = || Error::Config(format!("Unparseable location {value:?}"));

        let mut parts = value.split(',');
        let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(unparseable());
        };
        let lat = lat.trim().parse::<f64>().map_err(|_| unparseable())?;
        let lng = lng.trim().parse::<f64>().map_err(|_| unparseable())?;

        Self::new(lat, lng)
    }
}

impl TryFrom<String> for GeoPoint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GeoPoint> for String {
    fn from(point: GeoPoint) -> Self {
        point.to_string()
    }
}

// ── Readings ──────────────────────────────────────────────────────────

/// Normalized current-conditions snapshot for one location.
///
/// Produced whole by a provider adapter or not at all; there is no
/// partially-filled reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Air temperature, °C.
    pub temperature: f64,
    /// Atmospheric pressure, hPa.
    pub pressure: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// Wind speed, m/s.
    pub wind_speed: f64,
    /// Wind direction, degrees from north.
    pub wind_direction: f64,
    /// Cloud cover, percent.
    pub cloud_cover: f64,
}

impl Reading {
    /// All-NaN placeholder exported for a location that failed to collect.
    pub fn unavailable() -> Self {
        Self {
            temperature: f64::NAN,
            pressure: f64::NAN,
            humidity: f64::NAN,
            wind_speed: f64::NAN,
            wind_direction: f64::NAN,
            cloud_cover: f64::NAN,
        }
    }

    /// Compass label for this reading's wind direction.
    pub fn wind_compass(&self) -> &'static str {
        compass_label(self.wind_direction)
    }
}

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Sector width of the 16-point compass rose, in degrees.
const COMPASS_SECTOR: f64 = 22.5;

/// Map a wind direction to its 16-point compass label.
///
/// Sector `i` covers `[22.5 * i, 22.5 * (i + 1))`. Anything outside
/// `[0, 360)` (including NaN) yields `"unknown"`.
pub fn compass_label(degrees: f64) -> &'static str {
    if !(0.0..360.0).contains(&degrees) {
        return "unknown";
    }
    let sector = (degrees / COMPASS_SECTOR).floor() as usize;
    COMPASS_POINTS.get(sector).copied().unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geo_point() {
        let point: GeoPoint = " 51.5 , -0.12 ".parse().expect("valid point");
        assert_eq!(point.lat(), 51.5);
        assert_eq!(point.lng(), -0.12);
        assert_eq!(point.key(), "51.500000,-0.120000");
    }

    #[test]
    fn test_parse_geo_point_boundaries() {
        assert!("90,180".parse::<GeoPoint>().is_ok());
        assert!("-90,-180".parse::<GeoPoint>().is_ok());
    }

    #[test]
    fn test_parse_geo_point_rejects_bad_input() {
        for raw in ["", "51.5", "51.5,0,1", "north,west", "NaN,0", "inf,0"] {
            let err = raw.parse::<GeoPoint>().expect_err(raw);
            assert!(err.is_config(), "{raw}: {err}");
        }
    }

    #[test]
    fn test_parse_geo_point_rejects_out_of_range() {
        let err = "123,45".parse::<GeoPoint>().expect_err("latitude out of range");
        assert!(err.to_string().contains("Out of range"));
        assert!("0,180.5".parse::<GeoPoint>().is_err());
    }

    #[test]
    fn test_geo_point_serde_uses_string_form() {
        let point: GeoPoint = serde_json::from_str("\"40.7128,-74.006\"").expect("deserialize");
        assert_eq!(
            serde_json::to_string(&point).expect("serialize"),
            "\"40.712800,-74.006000\""
        );
        assert!(serde_json::from_str::<GeoPoint>("\"91,0\"").is_err());
    }

    #[test]
    fn test_compass_label_sectors() {
        assert_eq!(compass_label(0.0), "N");
        assert_eq!(compass_label(22.4), "N");
        assert_eq!(compass_label(22.5), "NNE");
        assert_eq!(compass_label(22.6), "NNE");
        assert_eq!(compass_label(44.9), "NNE");
        assert_eq!(compass_label(45.1), "NE");
        assert_eq!(compass_label(180.0), "S");
        assert_eq!(compass_label(320.0), "NW");
        assert_eq!(compass_label(359.9), "NNW");
    }

    #[test]
    fn test_compass_label_covers_every_sector_once() {
        for (i, label) in COMPASS_POINTS.iter().enumerate() {
            let start = COMPASS_SECTOR * i as f64;
            assert_eq!(compass_label(start), *label);
            assert_eq!(compass_label(start + COMPASS_SECTOR - 0.01), *label);
        }
    }

    #[test]
    fn test_compass_label_out_of_range() {
        assert_eq!(compass_label(360.0), "unknown");
        assert_eq!(compass_label(-0.1), "unknown");
        assert_eq!(compass_label(f64::NAN), "unknown");
    }

    #[test]
    fn test_reading_wind_compass() {
        let reading = Reading {
            temperature: 20.24,
            pressure: 1012.0,
            humidity: 59.0,
            wind_speed: 4.63,
            wind_direction: 320.0,
            cloud_cover: 75.0,
        };
        assert_eq!(reading.wind_compass(), "NW");
    }

    #[test]
    fn test_unavailable_reading_is_all_nan() {
        let reading = Reading::unavailable();
        assert!(reading.temperature.is_nan());
        assert!(reading.cloud_cover.is_nan());
        assert_eq!(reading.wind_compass(), "unknown");
    }
}
