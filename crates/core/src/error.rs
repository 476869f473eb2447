//! Unified error types for the wpbm core.
//!
//! Display strings carry a stable upper-case code prefix so that reports and
//! logs can be grepped regardless of which layer raised the error.

use tokio_rusqlite::rusqlite;

/// Errors raised by the cache store, the site registry and the report writer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty report type).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Filesystem access failed.
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be serialized or deserialized.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialization(String),

    /// Site name not present in the registry.
    #[error("UNKNOWN_SITE: {0}")]
    UnknownSite(String),

    /// No API key stored for the site.
    #[error("SECRET_MISSING: no API key stored for site {0}")]
    SecretMissing(String),

    /// The secret store does not support writes.
    #[error("SECRET_READ_ONLY: {0}")]
    SecretReadOnly(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
