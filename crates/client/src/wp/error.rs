//! Transport client error types.

use std::sync::Arc;

use super::base_url::UrlError;

/// Errors from the WordPress bulk manager API client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No API key configured for the site.
    #[error("MISSING_API_KEY: no API key for site {0}")]
    MissingApiKey(String),

    /// Site base URL could not be canonicalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(#[from] UrlError),

    /// Caller supplied something the client refuses to send.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Plugin archive failed local validation.
    #[error("INVALID_ARCHIVE: {0}")]
    InvalidArchive(String),

    /// Non-success HTTP status. `message` is the server's explanation when it sent one.
    #[error("HTTP_ERROR: {status} {message}")]
    Http { status: u16, message: String },

    /// Request timeout.
    #[error("TIMEOUT: request timed out")]
    Timeout,

    /// Connection-level failure.
    #[error("NETWORK_ERROR: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body was not the expected JSON.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// Local filesystem failure while streaming a download or reading an upload.
    #[error("IO_ERROR: {0}")]
    Io(Arc<std::io::Error>),
}

impl ApiError {
    /// Whether another attempt may succeed: connection failures, timeouts and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if let Some(status) = err.status() {
            ApiError::Http { status: status.as_u16(), message: err.to_string() }
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(Arc::new(err))
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Timeout.is_transient());
        assert!(ApiError::Http { status: 500, message: String::new() }.is_transient());
        assert!(ApiError::Http { status: 503, message: String::new() }.is_transient());
        assert!(!ApiError::Http { status: 404, message: String::new() }.is_transient());
        assert!(!ApiError::Http { status: 429, message: String::new() }.is_transient());
        assert!(!ApiError::InvalidArchive("bad".into()).is_transient());
        assert!(!ApiError::Parse("eof".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Http { status: 500, message: "boom".into() };
        assert_eq!(err.to_string(), "HTTP_ERROR: 500 boom");
        assert_eq!(err.status(), Some(500));

        let err = ApiError::MissingApiKey("acme".into());
        assert!(err.to_string().contains("acme"));
    }
}
