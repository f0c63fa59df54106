#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Engine-agnostic torrent interfaces and DTOs.
//!
//! Layout: `model` (records, specs, snapshots), `link.rs` (magnet and hash
//! links), `metainfo.rs` (`.torrent` decoding), `service` (collaborator and
//! workflow traits), `error.rs` (shared error taxonomy).

pub mod error;
pub mod link;
pub mod metainfo;
pub mod model;
pub mod service;

pub use error::{TorrentError, TorrentResult};
pub use link::{ParsedLink, decode_html_entities, parse_link};
pub use metainfo::parse_metainfo;
pub use model::{
    AddTorrentRequest, DescriptivePatch, FileEntry, InfoHash, MediaMetadata, Metainfo,
    MetainfoFile, MimeClass, RegisterOptions, TorrentLifecycle, TorrentRecord, TorrentSnapshot,
    TorrentSource, TorrentSpec,
};
pub use service::{MediaDiscovery, MetadataLookup, TorrentEngine, TorrentStore, TorrentWorkflow};
