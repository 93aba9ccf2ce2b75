//! The flatten/convert/validate core of the pipeline.
//!
//! `transform` is a pure function: no I/O, no clock access. The collection
//! timestamp is supplied by the driver, so the same raw reading and the
//! same instant always produce an identical record.

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::TransformError;
use crate::models::{RawWeatherReading, WeatherRecord};

/// Physically plausible surface temperature bounds, degrees Celsius.
/// Values outside this range indicate a conversion bug, not weather.
const MIN_PLAUSIBLE_C: f64 = -90.0;
const MAX_PLAUSIBLE_C: f64 = 60.0;

/// Convert a Kelvin reading to Celsius.
fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - 273.15
}

/// Flatten a raw provider reading into a `WeatherRecord`.
///
/// Each of the four temperatures is converted from its own Kelvin source,
/// validated against the plausible range, and stored independently. The
/// first entry of the condition list supplies the condition fields;
/// additional simultaneous conditions are discarded.
///
/// # Errors
///
/// Returns an error if any required source field is absent, a converted
/// temperature is non-finite or implausible, or a sun instant cannot be
/// represented. No defaults are ever substituted.
pub fn transform(
    raw: &RawWeatherReading,
    city: &str,
    collected_at: DateTime<Utc>,
) -> Result<WeatherRecord, TransformError> {
    let condition = raw
        .weather
        .first()
        .ok_or(TransformError::MissingCondition)?;

    let temperature_c = convert_temperature(raw.main.temp, "main.temp")?;
    let thermal_sensation_c = convert_temperature(raw.main.feels_like, "main.feels_like")?;
    let temp_min_c = convert_temperature(raw.main.temp_min, "main.temp_min")?;
    let temp_max_c = convert_temperature(raw.main.temp_max, "main.temp_max")?;

    Ok(WeatherRecord {
        city: city.to_string(),
        temperature_c,
        thermal_sensation_c,
        temp_min_c,
        temp_max_c,
        humidity: require(raw.main.humidity, "main.humidity")?,
        pressure: require(raw.main.pressure, "main.pressure")?,
        wind_speed: require(raw.wind.speed, "wind.speed")?,
        wind_direction: require(raw.wind.deg, "wind.deg")?,
        latitude: require(raw.coord.lat, "coord.lat")?,
        longitude: require(raw.coord.lon, "coord.lon")?,
        weather_main: condition.main.clone(),
        weather_description: condition.description.clone(),
        weather_icon: condition.icon.clone(),
        sys_country: require(raw.sys.country.clone(), "sys.country")?,
        sys_sunrise: sun_instant(raw.sys.sunrise, "sys.sunrise")?,
        sys_sunset: sun_instant(raw.sys.sunset, "sys.sunset")?,
        collection_timestamp: collected_at,
    })
}

/// Unwrap a required source field.
fn require<T>(value: Option<T>, field: &'static str) -> Result<T, TransformError> {
    value.ok_or(TransformError::MissingField(field))
}

/// Convert one required Kelvin field and enforce the plausible range.
fn convert_temperature(kelvin: Option<f64>, field: &'static str) -> Result<f64, TransformError> {
    let celsius = kelvin_to_celsius(require(kelvin, field)?);
    if !celsius.is_finite() || !(MIN_PLAUSIBLE_C..=MAX_PLAUSIBLE_C).contains(&celsius) {
        return Err(TransformError::OutOfRange { field, celsius });
    }
    Ok(celsius)
}

/// Convert a required epoch-second field into a UTC instant.
fn sun_instant(secs: Option<i64>, field: &'static str) -> Result<DateTime<Utc>, TransformError> {
    Utc.timestamp_opt(require(secs, field)?, 0)
        .single()
        .ok_or(TransformError::InvalidTimestamp(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, Coordinates, MainReadings, SysReadings, WindReadings};

    /// Raw reading matching the end-to-end scenario payload.
    fn sample_raw() -> RawWeatherReading {
        RawWeatherReading {
            main: MainReadings {
                temp: Some(300.0),
                feels_like: Some(299.0),
                temp_min: Some(298.0),
                temp_max: Some(302.0),
                humidity: Some(70),
                pressure: Some(1013),
            },
            weather: vec![Condition {
                main: "Clear".to_string(),
                description: "clear sky".to_string(),
                icon: "01d".to_string(),
            }],
            wind: WindReadings {
                speed: Some(3.5),
                deg: Some(180),
            },
            sys: SysReadings {
                country: Some("BR".to_string()),
                sunrise: Some(1_700_000_000),
                sunset: Some(1_700_040_000),
            },
            coord: Coordinates {
                lat: Some(-22.9),
                lon: Some(-43.2),
            },
        }
    }

    fn collected_at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_010_000, 0).single().expect("valid")
    }

    #[test]
    fn test_end_to_end_sample() {
        let record =
            transform(&sample_raw(), "Rio de Janeiro", collected_at()).expect("valid reading");

        assert!((record.temperature_c - 26.85).abs() < 1e-9);
        assert!((record.thermal_sensation_c - 25.85).abs() < 1e-9);
        assert!((record.temp_min_c - 24.85).abs() < 1e-9);
        assert!((record.temp_max_c - 28.85).abs() < 1e-9);
        assert_eq!(record.city, "Rio de Janeiro");
        assert_eq!(record.humidity, 70);
        assert_eq!(record.pressure, 1013);
        assert_eq!(record.wind_speed, 3.5);
        assert_eq!(record.wind_direction, 180);
        assert_eq!(record.latitude, -22.9);
        assert_eq!(record.longitude, -43.2);
        assert_eq!(record.weather_main, "Clear");
        assert_eq!(record.weather_description, "clear sky");
        assert_eq!(record.weather_icon, "01d");
        assert_eq!(record.sys_country, "BR");
        assert_eq!(record.sys_sunrise.timestamp(), 1_700_000_000);
        assert_eq!(record.sys_sunset.timestamp(), 1_700_040_000);
        assert_eq!(record.collection_timestamp, collected_at());
    }

    #[test]
    fn test_deterministic() {
        let a = transform(&sample_raw(), "Rio de Janeiro", collected_at()).expect("valid");
        let b = transform(&sample_raw(), "Rio de Janeiro", collected_at()).expect("valid");
        assert_eq!(a, b);
    }

    #[test]
    fn test_temperatures_not_aliased() {
        // Four distinct Kelvin sources must map to four distinct Celsius
        // values; a shared conversion would collapse them.
        let record = transform(&sample_raw(), "Rio", collected_at()).expect("valid");
        let temps = [
            record.temperature_c,
            record.thermal_sensation_c,
            record.temp_min_c,
            record.temp_max_c,
        ];
        for (i, a) in temps.iter().enumerate() {
            for b in temps.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_empty_condition_list() {
        let mut raw = sample_raw();
        raw.weather.clear();

        let err = transform(&raw, "Rio", collected_at()).expect_err("must reject");
        assert_eq!(err, TransformError::MissingCondition);
    }

    #[test]
    fn test_first_condition_wins() {
        let mut raw = sample_raw();
        raw.weather.push(Condition {
            main: "Mist".to_string(),
            description: "mist".to_string(),
            icon: "50d".to_string(),
        });

        let record = transform(&raw, "Rio", collected_at()).expect("valid");
        assert_eq!(record.weather_main, "Clear");
        assert_eq!(record.weather_icon, "01d");
    }

    #[test]
    fn test_missing_required_fields() {
        let cases: &[(fn(&mut RawWeatherReading), &str)] = &[
            (|r| r.main.temp = None, "main.temp"),
            (|r| r.main.feels_like = None, "main.feels_like"),
            (|r| r.main.temp_min = None, "main.temp_min"),
            (|r| r.main.temp_max = None, "main.temp_max"),
            (|r| r.main.humidity = None, "main.humidity"),
            (|r| r.main.pressure = None, "main.pressure"),
            (|r| r.wind.speed = None, "wind.speed"),
            (|r| r.wind.deg = None, "wind.deg"),
            (|r| r.coord.lat = None, "coord.lat"),
            (|r| r.coord.lon = None, "coord.lon"),
            (|r| r.sys.country = None, "sys.country"),
            (|r| r.sys.sunrise = None, "sys.sunrise"),
            (|r| r.sys.sunset = None, "sys.sunset"),
        ];

        for &(mutate, field) in cases {
            let mut raw = sample_raw();
            mutate(&mut raw);

            let err = transform(&raw, "Rio", collected_at())
                .expect_err("missing field must be rejected");
            assert_eq!(err, TransformError::MissingField(field));
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        // 150 K is roughly -123 degC, far below any surface reading
        let mut raw = sample_raw();
        raw.main.temp = Some(150.0);
        let err = transform(&raw, "Rio", collected_at()).expect_err("must reject");
        assert!(matches!(
            err,
            TransformError::OutOfRange {
                field: "main.temp",
                ..
            }
        ));

        // 350 K is roughly 77 degC, above the plausible maximum
        let mut raw = sample_raw();
        raw.main.temp_max = Some(350.0);
        let err = transform(&raw, "Rio", collected_at()).expect_err("must reject");
        assert!(matches!(
            err,
            TransformError::OutOfRange {
                field: "main.temp_max",
                ..
            }
        ));
    }

    #[test]
    fn test_plausible_bounds_inclusive() {
        let mut raw = sample_raw();
        // Exactly -90 degC and exactly 60 degC are accepted
        raw.main.temp_min = Some(-90.0 + 273.15);
        raw.main.temp_max = Some(60.0 + 273.15);

        let record = transform(&raw, "Rio", collected_at()).expect("bounds are inclusive");
        assert!((record.temp_min_c - -90.0).abs() < 1e-9);
        assert!((record.temp_max_c - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrepresentable_sun_instant_rejected() {
        // i64::MAX seconds is far beyond what chrono can represent
        let mut raw = sample_raw();
        raw.sys.sunrise = Some(i64::MAX);
        let err = transform(&raw, "Rio", collected_at()).expect_err("must reject");
        assert_eq!(err, TransformError::InvalidTimestamp("sys.sunrise"));

        let mut raw = sample_raw();
        raw.sys.sunset = Some(i64::MIN);
        let err = transform(&raw, "Rio", collected_at()).expect_err("must reject");
        assert_eq!(err, TransformError::InvalidTimestamp("sys.sunset"));
    }

    #[test]
    fn test_kelvin_to_celsius_exact() {
        assert_eq!(kelvin_to_celsius(273.15), 0.0);
        assert_eq!(kelvin_to_celsius(300.0), 300.0 - 273.15);
    }
}
