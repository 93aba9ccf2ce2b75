//! OpenWeather API client.
//!
//! One HTTP GET per pipeline run. Requests `units=standard` so every
//! temperature arrives in Kelvin and the transformer's conversion is
//! unconditional. Uses reqwest with rustls for TLS.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::FetchError;
use crate::models::RawWeatherReading;

/// Request timeout in seconds, matching the original collector.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("meteopipe/", env!("CARGO_PKG_VERSION"));

/// Cap on error-body length carried inside a `FetchError`.
const MAX_ERROR_BODY: usize = 200;

/// Client for the OpenWeather current-weather endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    /// Create a new client against the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot
    /// be initialized.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, FetchError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(FetchError::InvalidRequest("API key must not be empty"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    /// Fetch the current weather reading for a city.
    ///
    /// # Errors
    ///
    /// Returns an error if the city is empty, the request fails, the
    /// provider returns a non-success status, or the body cannot be parsed
    /// into the expected shape.
    #[instrument(skip(self), fields(city = city))]
    pub async fn fetch_current(&self, city: &str) -> Result<RawWeatherReading, FetchError> {
        if city.is_empty() {
            return Err(FetchError::InvalidRequest("city must not be empty"));
        }

        debug!("fetching current weather from {}", self.base_url);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "standard"),
            ])
            .send()
            .await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        // Parse from text so a malformed body surfaces as a parse error
        // with serde context rather than a bare reqwest decode error.
        let body = response.text().await?;
        let raw: RawWeatherReading = serde_json::from_str(&body)?;

        debug!(
            conditions = raw.weather.len(),
            "fetched current weather reading"
        );
        Ok(raw)
    }
}

/// Clip an error body for inclusion in an error message.
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        body.to_string()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX_ERROR_BODY)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}...", &body[..cut])
    }
}
