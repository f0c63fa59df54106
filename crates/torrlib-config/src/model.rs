//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers built once at startup and injected into services.
//! - Nothing here reads the environment; see `loader.rs`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::defaults::LifecycleTimings;

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub http: HttpConfig,
    /// Stream-reference library settings.
    pub library: LibraryConfig,
    /// Metadata lookup settings.
    pub metadata: MetadataConfig,
    /// Media-discovery restart settings.
    pub discovery: DiscoveryConfig,
    /// JSON file backing the torrent store.
    pub store_path: PathBuf,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Background lifecycle timings.
    pub timings: LifecycleTimings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Interface to bind.
    pub bind_addr: IpAddr,
    /// TCP port, never zero.
    pub port: u16,
}

impl HttpConfig {
    /// Socket address for the listener.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Stream-reference library settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Materialization base path; `None` disables materialization and cleanup.
    pub root: Option<PathBuf>,
    /// Materialize automatically once metadata arrives.
    pub auto_materialize: bool,
    /// Stream host override, `scheme://host[:port]` without a trailing slash.
    pub public_host: Option<String>,
}

/// Metadata lookup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    /// API key; lookup is disabled without one.
    pub tmdb_api_key: Option<String>,
    /// Result language.
    pub language: String,
}

/// Media-discovery restart settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Restart discovery after add, remove, and wipe.
    pub restart_on_mutation: bool,
    /// Media-server endpoint hit when discovery starts again.
    pub refresh_url: Option<String>,
}

/// Logger output selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Explicit output; `None` lets the logger infer one from the build.
    pub output: Option<LogOutput>,
}
