//! Torrent records, specs, and snapshot DTOs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TorrentError;

const INFO_HASH_HEX_LEN: usize = 40;

/// Stable content identifier: 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InfoHash(String);

impl InfoHash {
    /// Build an info-hash from the raw 20-byte SHA-1 digest.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Borrow the lowercase hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InfoHash {
    type Err = TorrentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.len() != INFO_HASH_HEX_LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TorrentError::InvalidHash {
                value: value.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for InfoHash {
    type Error = TorrentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InfoHash> for String {
    fn from(hash: InfoHash) -> Self {
        hash.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Lifecycle of a record as tracked by the engine.
///
/// Advances monotonically, except `LoadedFromStore -> InfoReady` which
/// re-enters the pipeline after a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentLifecycle {
    /// Accepted by the engine; metadata not requested yet.
    Registered,
    /// Waiting for peers to deliver metadata.
    InfoPending,
    /// Metadata (file list) is available.
    InfoReady,
    /// Metadata is available and the record is in the store.
    PersistedToStore,
    /// Dormant record hydrated from the store; needs a reload before use.
    LoadedFromStore,
}

impl TorrentLifecycle {
    /// Whether the file list can be trusted.
    #[must_use]
    pub const fn has_metadata(self) -> bool {
        matches!(self, Self::InfoReady | Self::PersistedToStore)
    }
}

/// Coarse media classification of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeClass {
    /// `video/*`
    Video,
    /// `audio/*`
    Audio,
    /// Anything else, the `*/*` class.
    Generic,
}

impl MimeClass {
    /// Classify a file by its extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match mime_guess::from_path(path).first() {
            Some(mime) if mime.type_().as_str() == "video" => Self::Video,
            Some(mime) if mime.type_().as_str() == "audio" => Self::Audio,
            _ => Self::Generic,
        }
    }

    /// Only streamable classes receive stream-reference files.
    #[must_use]
    pub const fn is_streamable(self) -> bool {
        !matches!(self, Self::Generic)
    }
}

/// One file inside a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// 1-based index understood by the stream endpoint.
    pub index: u32,
    /// Path relative to the torrent root, `/` separated.
    pub path: String,
    /// Size in bytes.
    pub length: u64,
    /// Media class derived from the extension.
    pub mime: MimeClass,
    /// Whether the file is part of the download selection.
    pub selected: bool,
}

/// File described by a metainfo document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetainfoFile {
    /// Path relative to the torrent root, `/` separated.
    pub path: String,
    /// Size in bytes.
    pub length: u64,
}

/// Subset of a `.torrent` info dictionary the library needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metainfo {
    /// Suggested torrent name.
    pub name: String,
    /// Files in declaration order.
    pub files: Vec<MetainfoFile>,
}

/// Engine-understood description of a torrent to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentSpec {
    /// Content identifier.
    pub info_hash: InfoHash,
    /// Display name carried by the link, when present.
    pub display_name: Option<String>,
    /// Announce URLs.
    pub trackers: Vec<String>,
    /// Decoded metainfo when the source was a `.torrent` payload.
    pub metainfo: Option<Metainfo>,
}

/// Raw user-supplied torrent source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSource {
    /// Magnet URI, bare info-hash, or remote `.torrent` URL.
    Link(String),
    /// Uploaded `.torrent` bytes.
    File(Vec<u8>),
}

/// Descriptive fields handed to the engine at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Human-facing title.
    pub title: String,
    /// Poster image URL.
    pub poster: String,
    /// Explicit category label.
    pub category: String,
    /// Free-form client payload.
    pub data: String,
    /// Custom library sub-directory; empty means none.
    pub custom_dir: String,
    /// 1-based file indices to download; `None` selects everything.
    pub selected_files: Option<Vec<u32>>,
}

/// Inbound add request after boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrentRequest {
    /// Torrent source.
    pub source: TorrentSource,
    /// Explicit title.
    pub title: Option<String>,
    /// Poster image URL.
    pub poster: Option<String>,
    /// Explicit category label.
    pub category: Option<String>,
    /// Free-form client payload.
    pub data: Option<String>,
    /// Custom library sub-directory.
    pub custom_dir: Option<String>,
    /// Write the record to the store once metadata arrives.
    pub persist: bool,
    /// Subset of files to download.
    pub selected_files: Option<Vec<u32>>,
    /// Scheme and authority the request arrived on, used for stream URLs.
    pub origin: Option<String>,
}

impl AddTorrentRequest {
    /// Request for `source` with every optional field unset.
    #[must_use]
    pub const fn new(source: TorrentSource) -> Self {
        Self {
            source,
            title: None,
            poster: None,
            category: None,
            data: None,
            custom_dir: None,
            persist: false,
            selected_files: None,
            origin: None,
        }
    }
}

/// Result of a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Canonical title.
    pub title: String,
    /// Absolute poster URL, when the service has one.
    pub poster_url: Option<String>,
}

/// Partial update of descriptive fields; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptivePatch {
    /// New title.
    pub title: Option<String>,
    /// New poster URL.
    pub poster: Option<String>,
    /// New category label.
    pub category: Option<String>,
    /// New free-form payload.
    pub data: Option<String>,
}

impl DescriptivePatch {
    /// True when the patch carries no changes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.poster.is_none() && self.category.is_none() && self.data.is_none()
    }
}

/// Torrent record owned by the engine. The orchestrator mutates the
/// descriptive fields and `materialized_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Content identifier, immutable once assigned.
    pub hash: InfoHash,
    /// Engine-resolved name.
    pub name: String,
    /// Human-facing title; may be empty.
    #[serde(default)]
    pub title: String,
    /// Poster URL; may be empty.
    #[serde(default)]
    pub poster: String,
    /// Explicit category label; may be empty.
    #[serde(default)]
    pub category: String,
    /// Free-form client payload; may be empty.
    #[serde(default)]
    pub data: String,
    /// Custom library sub-directory; empty means none.
    #[serde(default)]
    pub custom_dir: String,
    /// Current lifecycle stage.
    pub lifecycle: TorrentLifecycle,
    /// Root of the materialized tree once written; authoritative for cleanup.
    #[serde(default)]
    pub materialized_path: Option<PathBuf>,
    /// Files, populated once metadata is available.
    #[serde(default)]
    pub files: Vec<FileEntry>,
    /// Registration time.
    pub added_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl TorrentRecord {
    /// Fresh record for a just-registered torrent.
    #[must_use]
    pub fn new(hash: InfoHash, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            hash,
            name: name.into(),
            title: String::new(),
            poster: String::new(),
            category: String::new(),
            data: String::new(),
            custom_dir: String::new(),
            lifecycle: TorrentLifecycle::Registered,
            materialized_path: None,
            files: Vec::new(),
            added_at: now,
            updated_at: now,
        }
    }

    /// Title used for classification: explicit title, else the engine name.
    #[must_use]
    pub fn effective_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.name
        } else {
            &self.title
        }
    }

    /// Files that qualify for a stream reference.
    pub fn streamable_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|file| file.mime.is_streamable())
    }

    /// Apply a descriptive patch, returning whether anything changed.
    pub fn apply_patch(&mut self, patch: &DescriptivePatch) -> bool {
        let mut changed = false;
        for (slot, value) in [
            (&mut self.title, &patch.title),
            (&mut self.poster, &patch.poster),
            (&mut self.category, &patch.category),
            (&mut self.data, &patch.data),
        ] {
            if let Some(value) = value
                && slot != value
            {
                slot.clone_from(value);
                changed = true;
            }
        }
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Serializable status view.
    #[must_use]
    pub fn snapshot(&self) -> TorrentSnapshot {
        TorrentSnapshot::from(self)
    }
}

/// Status view returned by add, get, and list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentSnapshot {
    /// Info-hash.
    pub hash: String,
    /// Engine-resolved name.
    pub name: String,
    /// Title.
    pub title: String,
    /// Poster URL.
    pub poster: String,
    /// Category label.
    pub category: String,
    /// Free-form payload.
    pub data: String,
    /// Custom library sub-directory.
    pub custom_dir: String,
    /// Lifecycle stage.
    pub status: TorrentLifecycle,
    /// Root of the materialized tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materialized_path: Option<String>,
    /// Files known so far.
    pub files: Vec<FileEntry>,
    /// Registration time.
    pub added_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl From<&TorrentRecord> for TorrentSnapshot {
    fn from(record: &TorrentRecord) -> Self {
        Self {
            hash: record.hash.to_string(),
            name: record.name.clone(),
            title: record.title.clone(),
            poster: record.poster.clone(),
            category: record.category.clone(),
            data: record.data.clone(),
            custom_dir: record.custom_dir.clone(),
            status: record.lifecycle,
            materialized_path: record
                .materialized_path
                .as_ref()
                .map(|path| path.display().to_string()),
            files: record.files.clone(),
            added_at: record.added_at,
            updated_at: record.updated_at,
        }
    }
}
