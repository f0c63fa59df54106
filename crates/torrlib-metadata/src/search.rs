use anyhow::Context;
use async_trait::async_trait;
use torrlib_torrent_core::{MediaMetadata, MetadataLookup};
use tracing::debug;

use crate::client::{POSTER_BASE_URL, REQUEST_TIMEOUT, TmdbClient};
use crate::error::{MetadataError, Result};
use crate::models::{RawPaginatedResponse, SearchMultiResult};

impl TmdbClient {
    /// First movie or TV result for `query`, person results skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::NoResults`] when nothing matched, or the
    /// transport, status, or decoding failure otherwise.
    pub async fn search_multi(&self, query: &str) -> Result<MediaMetadata> {
        let response = self
            .client()
            .get(self.url("/search/multi"))
            .query(&[
                ("api_key", self.api_key()),
                ("language", self.lang.as_str()),
                ("query", query),
                ("include_adult", "false"),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let raw: RawPaginatedResponse = self.handle_response(response).await?;
        let (title, poster_path) = raw
            .results
            .into_iter()
            .find_map(SearchMultiResult::from_value)
            .map(SearchMultiResult::into_parts)
            .ok_or(MetadataError::NoResults)?;

        debug!(query, title = %title, "metadata lookup matched");
        Ok(MediaMetadata {
            title,
            poster_url: poster_path
                .filter(|path| !path.is_empty())
                .map(|path| format!("{POSTER_BASE_URL}{path}")),
        })
    }
}

#[async_trait]
impl MetadataLookup for TmdbClient {
    async fn search(&self, display_name: &str) -> anyhow::Result<MediaMetadata> {
        self.search_multi(display_name)
            .await
            .with_context(|| format!("metadata lookup failed for '{display_name}'"))
    }
}
