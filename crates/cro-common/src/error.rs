//! Error types for the cloud resource operator

use std::fmt;

/// Result type alias using CroError
pub type Result<T> = std::result::Result<T, CroError>;

/// Main error type for the operator
#[derive(Debug, thiserror::Error)]
pub enum CroError {
    /// Listing a managed resource kind failed
    #[error("Failed to list {kind} resources: {message}")]
    ListFailed { kind: String, message: String },

    /// A provider scrape call ran past its deadline
    #[error("Provider {provider} timed out scraping {resource}")]
    ScrapeTimeout { provider: String, resource: String },

    /// The metrics backend rejected or could not answer a query
    #[error("Provider query failed: {0}")]
    ProviderQuery(String),

    /// Gauge registration conflict at startup
    #[error("Metric registration failed: {0}")]
    Registration(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),
}

impl CroError {
    /// Listing failure for a resource kind
    pub fn list_failed<E: fmt::Display>(kind: impl Into<String>, err: E) -> Self {
        CroError::ListFailed {
            kind: kind.into(),
            message: err.to_string(),
        }
    }

    /// Get the error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            CroError::ListFailed { .. } => "LIST_FAILED",
            CroError::ScrapeTimeout { .. } => "SCRAPE_TIMEOUT",
            CroError::ProviderQuery(_) => "PROVIDER_QUERY",
            CroError::Registration(_) => "REGISTRATION",
            CroError::Http(_) => "HTTP_ERROR",
        }
    }
}

// Implement conversions from common error types
impl From<reqwest::Error> for CroError {
    fn from(err: reqwest::Error) -> Self {
        CroError::Http(err.to_string())
    }
}

impl From<prometheus::Error> for CroError {
    fn from(err: prometheus::Error) -> Self {
        CroError::Registration(err.to_string())
    }
}
