#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! HTTP surface for the torrent library.
//!
//! # Design
//! - A single action endpoint dispatches a tagged request body onto the
//!   [`TorrentWorkflow`](torrlib_torrent_core::TorrentWorkflow) façade.
//! - Handlers validate identifying fields at the boundary; business logic
//!   lives behind the workflow trait.
//! - Errors render as RFC9457 problem documents.

mod http;
pub mod models;
mod state;

#[cfg(test)]
mod testing;

pub use http::router::ApiServer;
