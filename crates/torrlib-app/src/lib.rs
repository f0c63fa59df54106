#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Torrent library application wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `orchestrator.rs` (torrent
//! lifecycle and stream-reference library), `sources.rs` (link and upload
//! resolution), `discovery.rs` (media-discovery restarts), `error.rs`.

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Media-discovery restart observer.
pub mod discovery;
/// Application-level errors.
pub mod error;
/// Torrent lifecycle orchestrator.
pub mod orchestrator;
/// Torrent source resolution.
pub mod sources;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
pub use orchestrator::{OrchestratorDeps, OrchestratorSettings, TorrentOrchestrator};
