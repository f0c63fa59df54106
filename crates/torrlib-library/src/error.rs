//! # Design
//!
//! - Constant messages; paths and operations travel as fields.
//! - Per-file failures are collected into reports instead of aborting a pass.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Errors produced while laying out or touching the library tree.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// IO failures while interacting with the filesystem.
    #[error("library io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A path component would escape its parent directory.
    #[error("unsafe library path component")]
    UnsafeComponent {
        /// Record field that supplied the component.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// A removal target is the library base or a shared category directory.
    #[error("refusing to remove shared library directory")]
    ProtectedPath {
        /// Path that was not removed.
        path: PathBuf,
    },
}

impl LibraryError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// A path that could not be written or removed, kept as data in reports.
#[derive(Debug)]
pub struct PathFailure {
    /// Path that failed.
    pub path: PathBuf,
    /// Failure detail.
    pub error: LibraryError,
}
