//! Error types for torrent core services.
//!
//! # Design
//!
//! - Messages are constant; context travels in fields.
//! - Callers at the HTTP edge map variants to status codes; nothing here knows
//!   about HTTP.

use std::error::Error;

use thiserror::Error;

/// Primary error type for torrent operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// A required identifying field was missing from the request.
    #[error("required field missing")]
    Validation {
        /// Name of the missing field.
        field: &'static str,
    },
    /// An info-hash string could not be parsed.
    #[error("invalid info hash")]
    InvalidHash {
        /// Offending input.
        value: String,
    },
    /// A link or metainfo payload could not be turned into a torrent spec.
    #[error("torrent spec could not be parsed")]
    InvalidSpec {
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional detail (offending fragment, nested error text).
        detail: Option<String>,
    },
    /// The engine refused to register the torrent.
    #[error("engine registration failed")]
    Registration {
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Torrent was not found.
    #[error("torrent not found")]
    NotFound {
        /// Missing info-hash.
        hash: String,
    },
    /// Operation failed in a collaborator.
    #[error("torrent operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Info-hash when available.
        hash: Option<String>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl TorrentError {
    /// Build an `InvalidSpec` error with a detail string.
    #[must_use]
    pub fn invalid_spec(reason: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidSpec {
            reason,
            detail: Some(detail.into()),
        }
    }

    /// Build an `OperationFailed` error from an `anyhow` failure.
    #[must_use]
    pub fn operation(
        operation: &'static str,
        hash: Option<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::OperationFailed {
            operation,
            hash,
            source: source.into(),
        }
    }

    /// Whether the error stems from caller input rather than a collaborator.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::InvalidHash { .. } | Self::InvalidSpec { .. }
        )
    }
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_classified() {
        assert!(TorrentError::Validation { field: "hash" }.is_client_error());
        assert!(TorrentError::invalid_spec("unsupported_scheme", "ftp://x").is_client_error());
        assert!(
            !TorrentError::NotFound {
                hash: "0".repeat(40)
            }
            .is_client_error()
        );
        let failure = TorrentError::operation("forget", None, anyhow::anyhow!("engine gone"));
        assert!(!failure.is_client_error());
        assert!(failure.source().is_some());
    }
}
