//! # Design
//!
//! - Centralize application-level errors for bootstrap.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Boxed source error from collaborators that report through `anyhow`.
pub type BoxedSource = Box<dyn StdError + Send + Sync>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: torrlib_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: torrlib_telemetry::TelemetryError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source server error.
        source: BoxedSource,
    },
    /// Torrent store operations failed.
    #[error("torrent store operation failed")]
    Store {
        /// Operation identifier.
        operation: &'static str,
        /// Source store error.
        source: BoxedSource,
    },
    /// Torrent engine operations failed.
    #[error("torrent engine operation failed")]
    Engine {
        /// Operation identifier.
        operation: &'static str,
        /// Source engine error.
        source: BoxedSource,
    },
    /// HTTP client construction failed.
    #[error("http client operation failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Source HTTP client error.
        source: reqwest::Error,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: torrlib_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: torrlib_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) fn api_server(operation: &'static str, source: anyhow::Error) -> Self {
        Self::ApiServer {
            operation,
            source: source.into(),
        }
    }

    pub(crate) fn store(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Store {
            operation,
            source: source.into(),
        }
    }

    pub(crate) fn engine(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Engine {
            operation,
            source: source.into(),
        }
    }
}
