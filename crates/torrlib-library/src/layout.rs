//! Deterministic library layout: directories, stream-reference names, and
//! stream URLs.

use std::path::{Component, Path, PathBuf};

use torrlib_torrent_core::{FileEntry, InfoHash, TorrentRecord};

use crate::classify::{LibraryCategory, classify};
use crate::error::{LibraryError, LibraryResult};

/// Extension given to every stream-reference file.
pub const STREAM_REF_SUFFIX: &str = ".strm";

/// Library rooted at a configured base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    base: PathBuf,
}

impl Library {
    /// Library rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Configured base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Category a record is filed under.
    #[must_use]
    pub fn category_of(record: &TorrentRecord) -> LibraryCategory {
        classify(&record.category, record.effective_title())
    }

    /// Directory holding every torrent of `category`.
    #[must_use]
    pub fn category_dir(&self, category: LibraryCategory) -> PathBuf {
        self.base.join(category.dir_name())
    }

    /// Custom sub-directory between the category and the torrent, when set.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::UnsafeComponent`] when the custom directory
    /// would leave the category directory.
    pub fn custom_dir(&self, record: &TorrentRecord) -> LibraryResult<Option<PathBuf>> {
        let custom = record.custom_dir.trim();
        if custom.is_empty() {
            return Ok(None);
        }
        let relative = safe_relative("custom_dir", custom)?;
        Ok(Some(
            self.category_dir(Self::category_of(record)).join(relative),
        ))
    }

    /// Root of a record's stream-reference tree:
    /// `base / category / [custom_dir /] name`.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::UnsafeComponent`] when the custom directory or
    /// the torrent name would leave the library.
    pub fn torrent_root(&self, record: &TorrentRecord) -> LibraryResult<PathBuf> {
        let parent = match self.custom_dir(record)? {
            Some(custom) => custom,
            None => self.category_dir(Self::category_of(record)),
        };
        let name = safe_relative("name", &record.name)?;
        if name.components().count() != 1 {
            return Err(LibraryError::UnsafeComponent {
                field: "name",
                value: record.name.clone(),
            });
        }
        Ok(parent.join(name))
    }

    /// Whether `path` is the base or a category directory.
    #[must_use]
    pub fn is_protected(&self, path: &Path) -> bool {
        path == self.base
            || LibraryCategory::ALL
                .iter()
                .any(|category| path == self.category_dir(*category))
    }
}

fn safe_relative(field: &'static str, value: &str) -> LibraryResult<PathBuf> {
    let path = PathBuf::from(value);
    let safe = path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !safe {
        return Err(LibraryError::UnsafeComponent {
            field,
            value: value.to_string(),
        });
    }
    Ok(path)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Stream-reference file name for a torrent file path: the basename with
/// backslashes stripped and the last extension replaced by `.strm`.
#[must_use]
pub fn stream_ref_name(path: &str) -> String {
    let name = basename(path).replace('\\', "");
    let stem = name.rsplit_once('.').map_or(name.as_str(), |(stem, _)| stem);
    format!("{stem}{STREAM_REF_SUFFIX}")
}

/// Stream URL written into a stream-reference file.
#[must_use]
pub fn stream_url(host: &str, hash: &InfoHash, file: &FileEntry) -> String {
    format!(
        "{host}/stream/{}?link={hash}&index={}&play",
        urlencoding::encode(basename(&file.path)),
        file.index
    )
}
