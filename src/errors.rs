//! Error types for meteopipe.
//!
//! One enum per pipeline stage, using `thiserror` for library-style
//! error definitions.

use thiserror::Error;

/// Errors raised while fetching the current reading from the provider.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request rejected before any I/O (empty city, empty API key)
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned a non-success status
    #[error("provider error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body was not the expected JSON shape
    #[error("failed to parse provider JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while flattening a raw reading into a record.
#[derive(Error, Debug, PartialEq)]
pub enum TransformError {
    /// The provider's weather condition list was empty
    #[error("weather condition list is empty")]
    MissingCondition,

    /// A required source field was absent
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A converted temperature fell outside the plausible range
    #[error("{field} out of plausible range: {celsius} degC")]
    OutOfRange { field: &'static str, celsius: f64 },

    /// An epoch-second value could not be represented as a timestamp
    #[error("unrepresentable epoch timestamp in {0}")]
    InvalidTimestamp(&'static str),
}

/// Errors raised while writing to or reading from the sink.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Connection, statement, or constraint failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors raised while reading configuration from the environment.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A required environment variable was not set
    #[error("environment variable {0} is required")]
    MissingVar(&'static str),

    /// A variable was set but could not be parsed
    #[error("environment variable {name} is invalid: {value}")]
    InvalidVar { name: &'static str, value: String },
}
