#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! In-process torrent engine.
//!
//! Keeps torrent records in memory and signals metadata readiness through
//! watch channels. Specs decoded from `.torrent` payloads are ready at once;
//! magnet and hash specs wait for [`MemoryEngine::resolve_metadata`].

mod memory;

pub use memory::MemoryEngine;
