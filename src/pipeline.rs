//! The ETL driver: one fetch → transform → load pass per invocation.
//!
//! Stateless between runs; an external scheduler (cron, systemd timer,
//! orchestration job) invokes `meteopipe run` on its own cadence. A failure
//! at any stage aborts the run with zero committed writes.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use crate::client::OpenWeatherClient;
use crate::config::Config;
use crate::db;
use crate::transform::transform;

/// Execute a single ETL pass, returning the inserted row id.
///
/// # Errors
///
/// Returns an error if any stage fails; the message names the stage.
pub async fn run_once(config: &Config) -> Result<i64> {
    let client = OpenWeatherClient::new(&config.api_url, &config.api_key)
        .context("fetch stage failed")?;

    let raw = client
        .fetch_current(&config.city)
        .await
        .context("fetch stage failed")?;

    if raw.weather.len() > 1 {
        // First-entry policy: simultaneous conditions beyond the first are
        // not stored. Logged so the information loss is observable.
        debug!(
            discarded = raw.weather.len() - 1,
            "multiple simultaneous weather conditions; keeping the first"
        );
    }

    let collected_at = Utc::now();
    let record = transform(&raw, &config.city, collected_at).context("transform stage failed")?;

    let row_id = db::load(&record, &config.db)
        .await
        .context("load stage failed")?;

    info!(
        row_id,
        city = %record.city,
        temperature_c = record.temperature_c,
        collected_at = %collected_at,
        "ETL pass complete"
    );

    Ok(row_id)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::DbConfig;

    fn test_config(api_url: String) -> Config {
        Config {
            api_key: "test-key".to_string(),
            city: "Rio de Janeiro".to_string(),
            api_url,
            db: DbConfig {
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                dbname: "postgres".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_before_any_write() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"cod":401,"message":"Invalid API key."}"#),
            )
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let err = run_once(&config).await.expect_err("401 must abort the run");

        // The failure is the fetch stage; the loader is never reached, so
        // no database connection is even attempted.
        assert!(err.to_string().contains("fetch stage failed"));
    }

    #[tokio::test]
    async fn test_transform_failure_aborts_before_load() {
        // Parses at fetch time (all top-level keys present) but the empty
        // condition list fails the transform stage.
        let body = r#"{
            "coord": {"lon": -43.2, "lat": -22.9},
            "weather": [],
            "main": {"temp": 300.0, "feels_like": 299.0, "temp_min": 298.0,
                     "temp_max": 302.0, "pressure": 1013, "humidity": 70},
            "wind": {"speed": 3.5, "deg": 180},
            "sys": {"country": "BR", "sunrise": 1700000000, "sunset": 1700040000}
        }"#;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let err = run_once(&config)
            .await
            .expect_err("empty condition list must abort the run");

        assert!(err.to_string().contains("transform stage failed"));
    }
}
