//! Torrent HTTP helpers (boundary validation, request origin, upload fields).

use axum::http::{HeaderMap, header::HOST};
use torrlib_torrent_core::{
    AddTorrentRequest, DescriptivePatch, InfoHash, TorrentError, TorrentResult, TorrentSource,
};

use crate::http::constants::{DEFAULT_SCHEME, HEADER_FORWARDED_PROTO};
use crate::models::{AddTorrentBody, HashBody, SetTorrentBody};

pub(crate) mod handlers;

/// Treat blank strings the same as absent ones.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Scheme and authority the request arrived on, e.g. `http://nas:8090`.
pub(crate) fn request_origin(headers: &HeaderMap) -> Option<String> {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty())?;
    let scheme = headers
        .get(HEADER_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|scheme| !scheme.is_empty())
        .unwrap_or(DEFAULT_SCHEME);
    Some(format!("{scheme}://{host}"))
}

pub(crate) fn require_hash(hash: Option<String>) -> TorrentResult<InfoHash> {
    non_blank(hash)
        .ok_or(TorrentError::Validation { field: "hash" })?
        .parse()
}

pub(crate) fn build_add_request(
    body: AddTorrentBody,
    origin: Option<String>,
) -> TorrentResult<AddTorrentRequest> {
    let link = non_blank(body.link).ok_or(TorrentError::Validation { field: "link" })?;
    let mut request = AddTorrentRequest::new(TorrentSource::Link(link));
    request.title = non_blank(body.title);
    request.poster = non_blank(body.poster);
    request.category = non_blank(body.category);
    request.data = non_blank(body.data);
    request.custom_dir = non_blank(body.custom_dir);
    request.persist = body.persist;
    request.origin = origin;
    Ok(request)
}

pub(crate) fn build_patch(body: SetTorrentBody) -> TorrentResult<(InfoHash, DescriptivePatch)> {
    let hash = require_hash(body.hash)?;
    let patch = DescriptivePatch {
        title: body.title,
        poster: body.poster,
        category: body.category,
        data: body.data,
    };
    Ok((hash, patch))
}

impl HashBody {
    pub(crate) fn into_hash(self) -> TorrentResult<InfoHash> {
        require_hash(self.hash)
    }
}

/// Fields collected from a multipart upload.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub(crate) file: Option<Vec<u8>>,
    pub(crate) save: bool,
    pub(crate) title: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) poster: Option<String>,
    pub(crate) data: Option<String>,
    pub(crate) custom_dir: Option<String>,
    pub(crate) selected_files: Option<Vec<u32>>,
}

impl UploadForm {
    /// Record a text part. Unknown part names are ignored.
    pub(crate) fn set_text(&mut self, name: &str, value: String) {
        match name {
            "save" | "save_to_db" => self.save = save_requested(&value),
            "title" => self.title = non_blank(Some(value)),
            "category" => self.category = non_blank(Some(value)),
            "poster" => self.poster = non_blank(Some(value)),
            "data" => self.data = non_blank(Some(value)),
            "custom_dir" | "strm_dir" => self.custom_dir = non_blank(Some(value)),
            "selected_files" => self.selected_files = serde_json::from_str(&value).ok(),
            _ => {}
        }
    }

    pub(crate) fn into_request(self, origin: Option<String>) -> TorrentResult<AddTorrentRequest> {
        let file = self
            .file
            .filter(|bytes| !bytes.is_empty())
            .ok_or(TorrentError::Validation { field: "file" })?;
        let mut request = AddTorrentRequest::new(TorrentSource::File(file));
        request.title = self.title;
        request.poster = self.poster;
        request.category = self.category;
        request.data = self.data;
        request.custom_dir = self.custom_dir;
        request.persist = self.save;
        request.selected_files = self.selected_files;
        request.origin = origin;
        Ok(request)
    }
}

// Any `save` part counts as a request to persist unless it says otherwise.
fn save_requested(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
