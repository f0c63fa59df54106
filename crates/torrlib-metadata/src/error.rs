//! Error types for metadata lookups.

use thiserror::Error;

/// Result alias for metadata lookups.
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Errors raised while talking to TMDB.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Transport failure or timeout.
    #[error("metadata request failed")]
    Http {
        /// Underlying client error.
        #[from]
        source: reqwest::Error,
    },
    /// TMDB answered with a non-success status.
    #[error("metadata service returned an error")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body.
        message: String,
    },
    /// Response body did not match the expected shape.
    #[error("metadata response could not be decoded")]
    Json {
        /// Underlying serde error.
        #[from]
        source: serde_json::Error,
    },
    /// No movie or TV result matched the query.
    #[error("no metadata found")]
    NoResults,
}
