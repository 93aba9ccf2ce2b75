//! Data models for the OpenWeather current-weather API and the sink row.
//!
//! `RawWeatherReading` mirrors the provider payload (Kelvin units). The
//! top-level objects are required at parse time, so a response missing one
//! of them fails in the fetch stage; nested scalars stay optional here and
//! are validated by the transformer, which owns the missing-field policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level response from the provider's current-weather endpoint.
///
/// Required keys per the fetch contract: `main`, `weather`, `wind`, `sys`,
/// `coord`. Anything else in the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWeatherReading {
    /// Temperature, pressure, and humidity readings
    pub main: MainReadings,

    /// Weather conditions, most significant first
    pub weather: Vec<Condition>,

    /// Wind readings
    pub wind: WindReadings,

    /// Country and sun metadata
    pub sys: SysReadings,

    /// Location coordinates
    pub coord: Coordinates,
}

/// The provider's `main` sub-object. All temperatures are Kelvin.
#[derive(Debug, Clone, Deserialize)]
pub struct MainReadings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    /// Relative humidity, percent
    pub humidity: Option<i32>,
    /// Pressure, hPa
    pub pressure: Option<i32>,
}

/// One entry of the provider's `weather` condition list.
#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    /// Condition group, e.g. "Clear", "Rain"
    pub main: String,

    /// Human-readable description, e.g. "clear sky"
    pub description: String,

    /// Provider icon code, e.g. "01d"
    pub icon: String,
}

/// The provider's `wind` sub-object.
#[derive(Debug, Clone, Deserialize)]
pub struct WindReadings {
    /// Wind speed, m/s
    pub speed: Option<f64>,

    /// Wind direction, meteorological degrees
    pub deg: Option<i32>,
}

/// The provider's `sys` sub-object.
#[derive(Debug, Clone, Deserialize)]
pub struct SysReadings {
    /// ISO country code
    pub country: Option<String>,

    /// Sunrise, epoch seconds UTC
    pub sunrise: Option<i64>,

    /// Sunset, epoch seconds UTC
    pub sunset: Option<i64>,
}

/// The provider's `coord` sub-object.
#[derive(Debug, Clone, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// One flat, immutable row in `weather.weather_data`.
///
/// Produced exactly once by the transformer, persisted exactly once by the
/// loader, never updated or deleted. Maps 1:1 to the sink table (minus the
/// serial `id`).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct WeatherRecord {
    /// Deployment city, from configuration (not the provider echo)
    pub city: String,

    /// Temperature, degrees Celsius
    pub temperature_c: f64,

    /// "Feels like" temperature, degrees Celsius
    pub thermal_sensation_c: f64,

    /// Minimum observed temperature, degrees Celsius
    pub temp_min_c: f64,

    /// Maximum observed temperature, degrees Celsius
    pub temp_max_c: f64,

    /// Relative humidity, percent
    pub humidity: i32,

    /// Atmospheric pressure, hPa
    pub pressure: i32,

    /// Wind speed, m/s
    pub wind_speed: f64,

    /// Wind direction, degrees
    pub wind_direction: i32,

    pub latitude: f64,
    pub longitude: f64,

    /// Condition group from the first weather-list entry
    pub weather_main: String,

    /// Condition description from the first weather-list entry
    pub weather_description: String,

    /// Provider icon code from the first weather-list entry
    pub weather_icon: String,

    /// ISO country code
    pub sys_country: String,

    /// Sunrise instant, UTC
    pub sys_sunrise: DateTime<Utc>,

    /// Sunset instant, UTC
    pub sys_sunset: DateTime<Utc>,

    /// When this run collected the reading (driver-assigned, not provider time)
    pub collection_timestamp: DateTime<Utc>,
}
