#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Binary entrypoint that wires the torrent library services together.

use torrlib_app::{AppResult, run_app};

/// Bootstraps the application and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
