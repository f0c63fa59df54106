#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Environment-backed configuration for the torrent library service.
//!
//! Layout: `model.rs` (typed configuration), `loader.rs` (environment
//! lookup), `validate.rs` (parsing helpers), `defaults.rs` (default values and
//! lifecycle timings).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::LifecycleTimings;
pub use error::{ConfigError, ConfigResult};
pub use model::{
    AppConfig, DiscoveryConfig, HttpConfig, LibraryConfig, LogOutput, LoggingSettings,
    MetadataConfig,
};
