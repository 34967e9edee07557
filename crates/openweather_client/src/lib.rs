//! OpenWeather API client.
//!
//! Fetches current conditions for a single point from `api.openweathermap.org`
//! (2.5 "weather" or 3.0 "onecall") and normalizes them into a `Reading`.

pub mod adapter;
pub mod client;

pub use adapter::{decode_reading, ApiVersion};
pub use client::{endpoint_from_env, OpenWeatherClient, WeatherSource, DEFAULT_ENDPOINT, ENDPOINT_ENV};
