#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! Persistence layer for torrent records.
//!
//! Records live in a single JSON document keyed by info-hash. Every write
//! replaces the document through a temporary file and a rename so readers
//! never observe a partial file.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use torrlib_torrent_core::{InfoHash, TorrentRecord, TorrentStore};
use tracing::debug;

type Catalog = BTreeMap<InfoHash, TorrentRecord>;

/// File-backed repository for torrent records.
#[derive(Debug)]
pub struct RuntimeStore {
    path: PathBuf,
    catalog: Mutex<Option<Catalog>>,
}

impl RuntimeStore {
    /// Store backed by the JSON document at `path`. The file is read lazily
    /// and created on the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            catalog: Mutex::new(None),
        }
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_catalog(&self) -> Result<Catalog> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Catalog::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read torrent store '{}'", self.path.display())
                });
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Catalog::new());
        }
        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to decode torrent store '{}'", self.path.display()))
    }

    async fn write_catalog(&self, catalog: &Catalog) -> Result<()> {
        let json = serde_json::to_vec_pretty(catalog).context("failed to encode torrent store")?;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create store directory '{}'", parent.display())
            })?;
        }
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, &json)
            .await
            .with_context(|| format!("failed to write '{}'", temp.display()))?;
        fs::rename(&temp, &self.path).await.with_context(|| {
            format!("failed to replace torrent store '{}'", self.path.display())
        })?;
        Ok(())
    }

    async fn mutate<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Catalog) -> bool + Send,
    {
        let mut guard = self.catalog.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_catalog().await?);
        }
        let Some(catalog) = guard.as_mut() else {
            return Ok(());
        };
        if apply(catalog) {
            self.write_catalog(catalog).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TorrentStore for RuntimeStore {
    async fn upsert(&self, record: &TorrentRecord) -> Result<()> {
        let record = record.clone();
        debug!(hash = %record.hash, "persisting torrent record");
        self.mutate(move |catalog| {
            catalog.insert(record.hash.clone(), record);
            true
        })
        .await
        .context("failed to upsert torrent record")
    }

    async fn remove(&self, hash: &InfoHash) -> Result<()> {
        self.mutate(|catalog| catalog.remove(hash).is_some())
            .await
            .context("failed to remove torrent record")
    }

    async fn load_all(&self) -> Result<Vec<TorrentRecord>> {
        let mut guard = self.catalog.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_catalog().await?);
        }
        Ok(guard
            .as_ref()
            .map(|catalog| catalog.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(seed: char, name: &str) -> TorrentRecord {
        TorrentRecord::new(seed.to_string().repeat(40).parse().expect("hash"), name)
    }

    #[tokio::test]
    async fn missing_file_loads_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let store = RuntimeStore::new(dir.path().join("store.json"));
        assert!(store.load_all().await?.is_empty());
        assert!(!store.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn records_survive_a_fresh_store() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("store.json");
        let store = RuntimeStore::new(&path);

        let mut first = record('a', "First");
        first.title = "Title".to_string();
        store.upsert(&first).await?;
        store.upsert(&record('b', "Second")).await?;
        first.poster = "http://poster".to_string();
        store.upsert(&first).await?;

        let reopened = RuntimeStore::new(&path);
        let records = reopened.load_all().await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], first);
        assert_eq!(records[1].name, "Second");
        assert!(!dir.path().join("nested").join("store.json.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn remove_deletes_and_ignores_unknown_hashes() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("store.json");
        let store = RuntimeStore::new(&path);
        let first = record('a', "First");
        store.upsert(&first).await?;

        store.remove(&first.hash).await?;
        store.remove(&"f".repeat(40).parse()?).await?;
        assert!(RuntimeStore::new(&path).load_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_documents_are_reported() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{ not json")?;
        let store = RuntimeStore::new(&path);
        let err = store.load_all().await.expect_err("corrupt store");
        assert!(err.to_string().contains("failed to decode torrent store"));
        Ok(())
    }
}
