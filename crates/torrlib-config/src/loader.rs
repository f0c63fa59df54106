//! Environment lookup and assembly of [`AppConfig`].
//!
//! # Design
//! - The loader accepts any lookup function so tests never touch process state.
//! - Unset and blank variables fall back to defaults.

use std::path::PathBuf;

use tracing::warn;

use crate::defaults::{
    DEFAULT_BIND_ADDR, DEFAULT_HTTP_PORT, DEFAULT_LOG_LEVEL, DEFAULT_STORE_PATH,
    DEFAULT_TMDB_LANGUAGE, LifecycleTimings,
};
use crate::error::ConfigResult;
use crate::model::{
    AppConfig, DiscoveryConfig, HttpConfig, LibraryConfig, LoggingSettings, MetadataConfig,
};
use crate::validate::{
    parse_absolute_path, parse_flag, parse_ip, parse_log_output, parse_origin, parse_port,
};

/// Listen interface.
pub const ENV_BIND_ADDR: &str = "TORRLIB_BIND_ADDR";
/// Listen port.
pub const ENV_HTTP_PORT: &str = "TORRLIB_HTTP_PORT";
/// Materialization base path.
pub const ENV_LIBRARY_ROOT: &str = "TORRLIB_LIBRARY_ROOT";
/// Automatic materialization toggle.
pub const ENV_LIBRARY_AUTO_CREATE: &str = "TORRLIB_LIBRARY_AUTO_CREATE";
/// Stream host override.
pub const ENV_PUBLIC_HOST: &str = "TORRLIB_PUBLIC_HOST";
/// Metadata lookup key.
pub const ENV_TMDB_API_KEY: &str = "TORRLIB_TMDB_API_KEY";
/// Metadata lookup language.
pub const ENV_TMDB_LANGUAGE: &str = "TORRLIB_TMDB_LANGUAGE";
/// Media-discovery restart toggle.
pub const ENV_DISCOVERY_RESTART: &str = "TORRLIB_DISCOVERY_RESTART";
/// Media-server refresh endpoint.
pub const ENV_DISCOVERY_REFRESH_URL: &str = "TORRLIB_DISCOVERY_REFRESH_URL";
/// Torrent store file.
pub const ENV_STORE_PATH: &str = "TORRLIB_STORE_PATH";
/// Default log filter.
pub const ENV_LOG_LEVEL: &str = "TORRLIB_LOG_LEVEL";
/// Log output format.
pub const ENV_LOG_FORMAT: &str = "TORRLIB_LOG_FORMAT";

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] when any variable is malformed.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] when any variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let http = HttpConfig {
            bind_addr: parse_ip(
                ENV_BIND_ADDR,
                get(ENV_BIND_ADDR).as_deref().unwrap_or(DEFAULT_BIND_ADDR),
            )?,
            port: get(ENV_HTTP_PORT)
                .map(|value| parse_port(ENV_HTTP_PORT, &value))
                .transpose()?
                .unwrap_or(DEFAULT_HTTP_PORT),
        };

        let library = LibraryConfig {
            root: get(ENV_LIBRARY_ROOT)
                .map(|value| parse_absolute_path(ENV_LIBRARY_ROOT, &value))
                .transpose()?,
            auto_materialize: get(ENV_LIBRARY_AUTO_CREATE)
                .map(|value| parse_flag(ENV_LIBRARY_AUTO_CREATE, &value))
                .transpose()?
                .unwrap_or(false),
            public_host: get(ENV_PUBLIC_HOST)
                .map(|value| parse_origin(ENV_PUBLIC_HOST, &value))
                .transpose()?,
        };
        if library.auto_materialize && library.root.is_none() {
            warn!(
                field = ENV_LIBRARY_AUTO_CREATE,
                "automatic materialization requested without a library root; it stays disabled"
            );
        }

        let metadata = MetadataConfig {
            tmdb_api_key: get(ENV_TMDB_API_KEY),
            language: get(ENV_TMDB_LANGUAGE).unwrap_or_else(|| DEFAULT_TMDB_LANGUAGE.to_string()),
        };

        let discovery = DiscoveryConfig {
            restart_on_mutation: get(ENV_DISCOVERY_RESTART)
                .map(|value| parse_flag(ENV_DISCOVERY_RESTART, &value))
                .transpose()?
                .unwrap_or(false),
            refresh_url: get(ENV_DISCOVERY_REFRESH_URL)
                .map(|value| parse_origin(ENV_DISCOVERY_REFRESH_URL, &value))
                .transpose()?,
        };

        let logging = LoggingSettings {
            level: get(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            output: get(ENV_LOG_FORMAT)
                .map(|value| parse_log_output(ENV_LOG_FORMAT, &value))
                .transpose()?,
        };

        Ok(Self {
            http,
            library,
            metadata,
            discovery,
            store_path: get(ENV_STORE_PATH)
                .map_or_else(|| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from),
            logging,
            timings: LifecycleTimings::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use crate::model::LogOutput;
    use std::collections::HashMap;
    use std::time::Duration;

    fn load(pairs: &[(&str, &str)]) -> ConfigResult<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        AppConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = load(&[]).expect("defaults load");
        assert_eq!(config.http.port, 8090);
        assert_eq!(config.http.socket_addr().to_string(), "0.0.0.0:8090");
        assert!(config.library.root.is_none());
        assert!(!config.library.auto_materialize);
        assert!(config.metadata.tmdb_api_key.is_none());
        assert_eq!(config.metadata.language, "en-US");
        assert!(!config.discovery.restart_on_mutation);
        assert_eq!(config.store_path, PathBuf::from("torrlib-store.json"));
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.output.is_none());
        assert_eq!(config.timings.metadata_wait, Duration::from_secs(60));
        assert_eq!(config.timings.materialize_delay, Duration::from_secs(5));
        assert_eq!(config.timings.media_server_delay, Duration::from_secs(15));
        assert_eq!(config.timings.pre_drop_delay, Duration::from_secs(15));
    }

    #[test]
    fn explicit_values_are_parsed() {
        let config = load(&[
            (ENV_BIND_ADDR, "127.0.0.1"),
            (ENV_HTTP_PORT, "9000"),
            (ENV_LIBRARY_ROOT, "/srv/library"),
            (ENV_LIBRARY_AUTO_CREATE, "yes"),
            (ENV_PUBLIC_HOST, "http://media.lan:9000/"),
            (ENV_TMDB_API_KEY, "secret"),
            (ENV_DISCOVERY_RESTART, "on"),
            (ENV_DISCOVERY_REFRESH_URL, "http://jellyfin:8096/Library/Refresh"),
            (ENV_LOG_FORMAT, "json"),
            (ENV_STORE_PATH, "/var/lib/torrlib/store.json"),
        ])
        .expect("explicit load");

        assert_eq!(config.http.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.library.root, Some(PathBuf::from("/srv/library")));
        assert!(config.library.auto_materialize);
        assert_eq!(
            config.library.public_host.as_deref(),
            Some("http://media.lan:9000")
        );
        assert_eq!(config.metadata.tmdb_api_key.as_deref(), Some("secret"));
        assert!(config.discovery.restart_on_mutation);
        assert_eq!(config.logging.output, Some(LogOutput::Json));
        assert_eq!(
            config.store_path,
            PathBuf::from("/var/lib/torrlib/store.json")
        );
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[(ENV_HTTP_PORT, "  "), (ENV_TMDB_API_KEY, "")]).expect("load");
        assert_eq!(config.http.port, 8090);
        assert!(config.metadata.tmdb_api_key.is_none());
    }

    #[test]
    fn malformed_values_name_the_field() {
        let cases = [
            (ENV_HTTP_PORT, "0"),
            (ENV_BIND_ADDR, "localhost"),
            (ENV_LIBRARY_ROOT, "library"),
            (ENV_LIBRARY_AUTO_CREATE, "sometimes"),
            (ENV_PUBLIC_HOST, "media.lan"),
            (ENV_LOG_FORMAT, "xml"),
        ];
        for (field, value) in cases {
            match load(&[(field, value)]) {
                Err(ConfigError::InvalidField { field: reported, .. }) => {
                    assert_eq!(reported, field);
                }
                other => panic!("expected invalid field for {field}, got {other:?}"),
            }
        }
    }
}
