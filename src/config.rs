//! Configuration from environment variables.
//!
//! Components never read the environment ambiently; everything is resolved
//! once into explicit structs and passed down, so the fetcher, transformer,
//! and loader stay independently testable.

use std::env;

use crate::errors::ConfigError;

/// Default city when `METEOPIPE_CITY` is unset.
const DEFAULT_CITY: &str = "Rio de Janeiro";

/// Default provider endpoint for current weather.
const DEFAULT_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenWeather API key (required)
    pub api_key: String,

    /// City to collect readings for, fixed per deployment
    pub city: String,

    /// Provider endpoint, overridable for testing
    pub api_url: String,

    /// Sink connection parameters
    pub db: DbConfig,
}

/// Postgres connection parameters.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl Config {
    /// Resolve the full configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENWEATHER_API_KEY` is unset or any set
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|name| env::var(name).ok())
    }

    /// Resolve configuration through an injectable variable lookup.
    fn resolve(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = get("OPENWEATHER_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar("OPENWEATHER_API_KEY"))?;

        Ok(Self {
            api_key,
            city: get("METEOPIPE_CITY").unwrap_or_else(|| DEFAULT_CITY.to_string()),
            api_url: get("OPENWEATHER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            db: DbConfig::resolve(get)?,
        })
    }
}

impl DbConfig {
    /// Resolve sink connection parameters from the process environment.
    ///
    /// Defaults match a stock local Postgres so a dev setup needs no
    /// variables at all.
    ///
    /// # Errors
    ///
    /// Returns an error if `DB_PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|name| env::var(name).ok())
    }

    fn resolve(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match get("DB_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidVar {
                name: "DB_PORT",
                value: raw,
            })?,
            None => 5432,
        };

        Ok(Self {
            host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port,
            user: get("DB_USER").unwrap_or_else(|| "postgres".to_string()),
            password: get("DB_PASSWORD").unwrap_or_default(),
            dbname: get("DB_DBNAME").unwrap_or_else(|| "postgres".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::resolve(lookup(&[])).expect_err("should require api key");
        assert_eq!(err, ConfigError::MissingVar("OPENWEATHER_API_KEY"));

        // Empty counts as missing
        let err = Config::resolve(lookup(&[("OPENWEATHER_API_KEY", "")]))
            .expect_err("empty key should be rejected");
        assert_eq!(err, ConfigError::MissingVar("OPENWEATHER_API_KEY"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::resolve(lookup(&[("OPENWEATHER_API_KEY", "test-key")]))
            .expect("minimal config should resolve");

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.city, DEFAULT_CITY);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.db.port, 5432);
        assert_eq!(config.db.user, "postgres");
        assert_eq!(config.db.password, "");
        assert_eq!(config.db.dbname, "postgres");
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::resolve(lookup(&[
            ("OPENWEATHER_API_KEY", "k"),
            ("METEOPIPE_CITY", "Oslo"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_USER", "etl"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_DBNAME", "weather"),
        ]))
        .expect("full config should resolve");

        assert_eq!(config.city, "Oslo");
        assert_eq!(config.db.host, "db.internal");
        assert_eq!(config.db.port, 6543);
        assert_eq!(config.db.user, "etl");
        assert_eq!(config.db.password, "s3cret");
        assert_eq!(config.db.dbname, "weather");
    }

    #[test]
    fn test_invalid_port() {
        let err = DbConfig::resolve(lookup(&[("DB_PORT", "not-a-port")]))
            .expect_err("bad port should be rejected");
        assert_eq!(
            err,
            ConfigError::InvalidVar {
                name: "DB_PORT",
                value: "not-a-port".to_string()
            }
        );
    }
}
