//! Error types for rJMX-Collector
//!
//! This module defines the error types used throughout the application.
//! Configuration errors live next to the configuration types in
//! [`crate::config`].

use thiserror::Error;

/// Transport (Jolokia) errors
#[derive(Error, Debug)]
pub enum CollectorError {
    /// HTTP client initialization failed
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest::Error),

    /// Reading the HTTP response failed
    #[error("Failed to read HTTP response: {0}")]
    HttpResponse(#[source] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// JSON body could not be parsed
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Jolokia answered the request with an error status
    #[error("Jolokia error (status {status}): {message}")]
    Jolokia { status: u16, message: String },

    /// Request timed out.
    /// The value is the configured timeout in milliseconds, if known.
    #[error("Request timed out{}", .0.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout(Option<u64>),

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication rejected
    #[error("Authentication failed")]
    AuthenticationFailed,
}

impl CollectorError {
    /// Whether the error means the endpoint itself is unusable.
    ///
    /// Fatal errors abort the whole collection pass. Everything else is
    /// scoped to the bean query that produced it.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CollectorError::Jolokia { .. } | CollectorError::JsonParse(_)
        )
    }

    /// Create a Timeout error with known duration
    pub fn timeout_with_duration(ms: u64) -> Self {
        CollectorError::Timeout(Some(ms))
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured timeout duration
            CollectorError::Timeout(None)
        } else if err.is_connect() {
            CollectorError::ConnectionFailed(err.to_string())
        } else if err.is_request() {
            CollectorError::HttpRequest(err)
        } else {
            CollectorError::HttpResponse(err)
        }
    }
}

/// Errors raised while mapping query results onto entities and metric sets.
///
/// Apart from [`CollectionError::Connection`], every variant is scoped to a
/// single attribute, bean, or bean query and never aborts a collection pass.
#[derive(Error, Debug)]
pub enum CollectionError {
    /// Key property list of a bean could not be tokenized
    #[error("failed to parse properties {0}")]
    MalformedKeyProperties(String),

    /// Attribute name has no `domain:` prefix
    #[error("invalid domain:bean string {0}")]
    InvalidBeanName(String),

    /// A bean query produced nothing usable
    #[error("empty data for pattern, Pattern: {pattern}{}", .reason.as_ref().map(|r| format!(", error: {}", r)).unwrap_or_default())]
    NoDataForPattern {
        pattern: String,
        reason: Option<String>,
    },

    /// Bean name could not be cut from a `<props>,attr=<name>` string
    #[error("failed to get bean name from {0}")]
    BeanNameExtraction(String),

    /// Attribute name could not be cut from a `<props>,attr=<name>` string
    #[error("failed to get attr name from {0}")]
    AttrNameExtraction(String),

    /// Entity could not be created
    #[error("failed to create entity: {0}")]
    EntityCreation(String),

    /// Transport failure that invalidates the whole pass
    #[error("JMX connection failed, error: {0}")]
    Connection(#[source] CollectorError),
}

impl CollectionError {
    /// Build a `NoDataForPattern` error without an underlying cause
    pub fn no_data(pattern: impl Into<String>) -> Self {
        CollectionError::NoDataForPattern {
            pattern: pattern.into(),
            reason: None,
        }
    }
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Collector error
    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),

    /// Collection pass error
    #[error("Collection error: {0}")]
    Collection(#[from] CollectionError),

    /// Publishing the payload failed
    #[error("Failed to publish integration: {0}")]
    Publish(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
