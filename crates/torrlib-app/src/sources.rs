//! Turns user-supplied torrent sources into engine specs.

use std::time::Duration;

use reqwest::Client;
use torrlib_torrent_core::{
    ParsedLink, TorrentError, TorrentResult, TorrentSource, TorrentSpec, parse_link,
    parse_metainfo,
};
use tracing::{debug, warn};

/// Ceiling for downloading a remote `.torrent` document.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Largest remote `.torrent` document accepted.
pub const MAX_METAINFO_BYTES: usize = 5 * 1024 * 1024;

/// Resolves links, remote metainfo URLs, and uploaded files.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    client: Client,
}

impl SourceResolver {
    /// Resolver downloading remote documents with `client`.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Normalise a source into a spec.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::InvalidSpec`] when the link or file cannot be
    /// parsed or a remote document cannot be fetched.
    pub async fn resolve(&self, source: &TorrentSource) -> TorrentResult<TorrentSpec> {
        match source {
            TorrentSource::File(bytes) => parse_metainfo(bytes),
            TorrentSource::Link(link) => match parse_link(link)? {
                ParsedLink::Spec(spec) => Ok(spec),
                ParsedLink::Remote(url) => {
                    let bytes = self.fetch(&url).await?;
                    parse_metainfo(&bytes)
                }
            },
        }
    }

    async fn fetch(&self, url: &str) -> TorrentResult<Vec<u8>> {
        debug!(url, "downloading remote metainfo");
        let response = self
            .client
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| {
                warn!(url, error = %err, "remote metainfo download failed");
                TorrentError::invalid_spec("remote_fetch_failed", err.to_string())
            })?;
        if response
            .content_length()
            .is_some_and(|length| length > MAX_METAINFO_BYTES as u64)
        {
            return Err(TorrentError::invalid_spec("metainfo_too_large", url));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| TorrentError::invalid_spec("remote_fetch_failed", err.to_string()))?;
        if bytes.len() > MAX_METAINFO_BYTES {
            return Err(TorrentError::invalid_spec("metainfo_too_large", url));
        }
        Ok(bytes.to_vec())
    }
}
