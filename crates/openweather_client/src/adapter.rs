//! OpenWeather response shapes and their translation into a [`Reading`].
//!
//! Two wire formats are supported, selected by [`ApiVersion`]:
//! the 2.5 "current weather" payload with top-level `main`/`wind`/`clouds`
//! blocks, and the 3.0 "one call" payload nesting everything under
//! `current`.

use common::{Error, GeoPoint, Reading};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Upstream API version, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    /// `GET /data/2.5/weather`
    #[default]
    CurrentWeather,
    /// `GET /data/3.0/onecall`
    OneCall,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::CurrentWeather => "2.5",
            ApiVersion::OneCall => "3.0",
        }
    }

    pub(crate) fn path(&self) -> &'static str {
        match self {
            ApiVersion::CurrentWeather => "/data/2.5/weather",
            ApiVersion::OneCall => "/data/3.0/onecall",
        }
    }

    /// Query parameters for one point. Note the credential parameter is
    /// spelled differently between versions.
    pub(crate) fn query(&self, point: GeoPoint, api_key: &str) -> Vec<(&'static str, String)> {
        let lat = format!("{:.6}", point.lat());
        let lon = format!("{:.6}", point.lng());
        match self {
            ApiVersion::CurrentWeather => vec![
                ("lat", lat),
                ("lon", lon),
                ("APPID", api_key.to_string()),
                ("units", "metric".to_string()),
            ],
            ApiVersion::OneCall => vec![
                ("lat", lat),
                ("lon", lon),
                ("appid", api_key.to_string()),
                ("exclude", "minutely,daily,hourly,alerts".to_string()),
                ("units", "metric".to_string()),
            ],
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "2.5" => Ok(ApiVersion::CurrentWeather),
            "3.0" => Ok(ApiVersion::OneCall),
            other => Err(Error::UnsupportedApiVersion(other.to_string())),
        }
    }
}

/// Decode a raw upstream payload of the given version into a [`Reading`].
pub fn decode_reading(version: ApiVersion, payload: &[u8]) -> Result<Reading, Error> {
    match version {
        ApiVersion::CurrentWeather => {
            let response: CurrentConditionsResponse = serde_json::from_slice(payload)?;
            Ok(response.to_reading())
        }
        ApiVersion::OneCall => {
            let response: OneCallResponse = serde_json::from_slice(payload)?;
            Ok(response.current.to_reading())
        }
    }
}

// ── 2.5 current weather ───────────────────────────────────────────────

/// Response from `/data/2.5/weather`.
#[derive(Debug, Deserialize)]
pub struct CurrentConditionsResponse {
    #[serde(default)]
    pub coord: Option<Coord>,
    #[serde(default)]
    pub weather: Vec<WeatherSummary>,
    pub main: MainBlock,
    pub wind: WindBlock,
    pub clouds: CloudsBlock,
    #[serde(default)]
    pub rain: Option<Precipitation>,
    #[serde(default)]
    pub snow: Option<Precipitation>,
    #[serde(default)]
    pub dt: i64,
    #[serde(default)]
    pub name: String,
}

impl CurrentConditionsResponse {
    pub fn to_reading(&self) -> Reading {
        Reading {
            temperature: self.main.temp,
            pressure: self.main.pressure,
            humidity: f64::from(self.main.humidity),
            wind_speed: self.wind.speed,
            wind_direction: self.wind.deg,
            cloud_cover: self.clouds.all,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherSummary {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    pub pressure: f64,
    /// Integer percent on the wire.
    pub humidity: u32,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub sea_level: Option<f64>,
    #[serde(default)]
    pub grnd_level: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WindBlock {
    pub speed: f64,
    pub deg: f64,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CloudsBlock {
    pub all: f64,
}

#[derive(Debug, Deserialize)]
pub struct Precipitation {
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    pub three_hour: Option<f64>,
}

// ── 3.0 one call ──────────────────────────────────────────────────────

/// Response from `/data/3.0/onecall` with everything but `current` excluded.
#[derive(Debug, Deserialize)]
pub struct OneCallResponse {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub timezone_offset: i64,
    pub current: OneCallCurrent,
}

#[derive(Debug, Deserialize)]
pub struct OneCallCurrent {
    #[serde(default)]
    pub dt: i64,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    pub pressure: f64,
    pub humidity: f64,
    #[serde(default)]
    pub dew_point: Option<f64>,
    #[serde(default)]
    pub uvi: Option<f64>,
    pub clouds: f64,
    #[serde(default)]
    pub visibility: Option<i64>,
    pub wind_speed: f64,
    pub wind_deg: f64,
    #[serde(default)]
    pub wind_gust: Option<f64>,
}

impl OneCallCurrent {
    pub fn to_reading(&self) -> Reading {
        Reading {
            temperature: self.temp,
            pressure: self.pressure,
            humidity: self.humidity,
            wind_speed: self.wind_speed,
            wind_direction: self.wind_deg,
            cloud_cover: self.clouds,
        }
    }
}
