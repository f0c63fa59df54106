#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! TMDB-backed media metadata lookup.

mod client;
mod error;
mod models;
mod search;

pub use client::{DEFAULT_BASE_URL, POSTER_BASE_URL, REQUEST_TIMEOUT, TmdbClient};
pub use error::{MetadataError, Result};
