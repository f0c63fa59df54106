#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Stream-reference library: classification, materialization, and cleanup.
//!
//! Everything here is synchronous filesystem work; async callers run it on a
//! blocking thread. Layout: `classify.rs` (category choice), `layout.rs`
//! (paths, names, URLs), `materialize.rs` (writes), `cleanup.rs` (removal).

pub mod classify;
pub mod cleanup;
pub mod error;
pub mod layout;
pub mod materialize;

pub use classify::{LibraryCategory, classify};
pub use cleanup::CleanupReport;
pub use error::{LibraryError, LibraryResult, PathFailure};
pub use layout::{Library, STREAM_REF_SUFFIX, stream_ref_name, stream_url};
pub use materialize::MaterializeReport;
