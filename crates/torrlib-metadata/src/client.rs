use std::time::Duration;

use reqwest::Client;

use crate::error::{MetadataError, Result};

/// Public TMDB API root.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
/// Prefix turning a `poster_path` into an absolute image URL.
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
/// Ceiling for a single lookup.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// TMDB client used for best-effort title and poster lookups.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    pub(crate) lang: String,
    base_url: String,
}

impl TmdbClient {
    /// Create a client with the given reqwest client, API key, and language.
    #[must_use]
    pub fn new(client: Client, api_key: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            lang: lang.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) const fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MetadataError::Api {
                status_code: status.as_u16(),
                message: body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}
