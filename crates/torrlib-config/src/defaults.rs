//! Default values and lifecycle timings.
//!
//! # Design
//! - Timings are fixed constants, not client-specified.
//! - They are carried as a value so tests can shrink them.

use std::time::Duration;

pub(crate) const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub(crate) const DEFAULT_HTTP_PORT: u16 = 8090;
pub(crate) const DEFAULT_TMDB_LANGUAGE: &str = "en-US";
pub(crate) const DEFAULT_STORE_PATH: &str = "torrlib-store.json";
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";

/// Upper bound on waiting for torrent metadata.
pub const METADATA_WAIT: Duration = Duration::from_secs(60);
/// Delay between metadata arrival and materialization on the plain add path.
pub const MATERIALIZE_DELAY: Duration = Duration::from_secs(5);
/// Delay before the media-server composite materializes.
pub const MEDIA_SERVER_DELAY: Duration = Duration::from_secs(15);
/// Delay between the media-server materialization and the automatic drop.
pub const PRE_DROP_DELAY: Duration = Duration::from_secs(15);

/// Fixed timings that drive the background lifecycle tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTimings {
    /// Ceiling for the metadata wait.
    pub metadata_wait: Duration,
    /// Pause before materializing after a plain add.
    pub materialize_delay: Duration,
    /// Pause before materializing in the media-server composite.
    pub media_server_delay: Duration,
    /// Pause between the composite's materialization and its drop.
    pub pre_drop_delay: Duration,
}

impl Default for LifecycleTimings {
    fn default() -> Self {
        Self {
            metadata_wait: METADATA_WAIT,
            materialize_delay: MATERIALIZE_DELAY,
            media_server_delay: MEDIA_SERVER_DELAY,
            pre_drop_delay: PRE_DROP_DELAY,
        }
    }
}

impl LifecycleTimings {
    /// Same timings with every delay set to `delay`; used by tests.
    #[must_use]
    pub const fn uniform(delay: Duration) -> Self {
        Self {
            metadata_wait: delay,
            materialize_delay: delay,
            media_server_delay: delay,
            pre_drop_delay: delay,
        }
    }
}
