//! Engine, store, lookup, and workflow traits implemented by adapters.

use std::path::Path;

use anyhow::bail;
use async_trait::async_trait;

use crate::error::TorrentResult;
use crate::model::{
    AddTorrentRequest, DescriptivePatch, InfoHash, MediaMetadata, RegisterOptions, TorrentRecord,
    TorrentSnapshot, TorrentSpec,
};

/// Torrent engine contract consumed by the orchestrator.
///
/// The engine owns records; callers receive clones and write mutations back
/// through [`TorrentEngine::update`].
#[async_trait]
pub trait TorrentEngine: Send + Sync {
    /// Register a spec, returning the engine's record. Registering a known
    /// hash refreshes its descriptive fields and returns the existing record.
    async fn register(
        &self,
        spec: TorrentSpec,
        options: RegisterOptions,
    ) -> anyhow::Result<TorrentRecord>;

    /// Look up a record by hash.
    async fn find(&self, hash: &InfoHash) -> Option<TorrentRecord>;

    /// Every record in registration order.
    async fn list(&self) -> Vec<TorrentRecord>;

    /// Write back the mutable fields of a record.
    async fn update(&self, record: &TorrentRecord) -> anyhow::Result<()>;

    /// Record the library root written for `hash` and promote a record that
    /// has metadata to `PersistedToStore`. Descriptive fields are left as the
    /// engine holds them. Returns the updated record.
    async fn record_materialization(
        &self,
        hash: &InfoHash,
        root: &Path,
    ) -> anyhow::Result<TorrentRecord>;

    /// Discard a record. Unknown hashes are ignored.
    async fn forget(&self, hash: &InfoHash) -> anyhow::Result<()>;

    /// Resolve once metadata for `hash` is available. Callers bound the wait
    /// with their own timeout.
    async fn wait_for_metadata(&self, hash: &InfoHash) -> anyhow::Result<TorrentRecord>;

    /// Evict a torrent while keeping persisted state; default implementation
    /// reports lack of support.
    async fn pause(&self, hash: &InfoHash) -> anyhow::Result<()> {
        let _ = hash;
        bail!("pause operation not supported by this engine");
    }

    /// Bring a dormant record back into the pipeline; default implementation
    /// reports lack of support.
    async fn reload(&self, hash: &InfoHash) -> anyhow::Result<TorrentRecord> {
        let _ = hash;
        bail!("reload operation not supported by this engine");
    }

    /// Seed dormant records loaded from the store; default implementation
    /// reports lack of support.
    async fn restore(&self, records: Vec<TorrentRecord>) -> anyhow::Result<()> {
        let _ = records;
        bail!("restore operation not supported by this engine");
    }
}

/// Durable torrent database.
#[async_trait]
pub trait TorrentStore: Send + Sync {
    /// Insert or replace a record.
    async fn upsert(&self, record: &TorrentRecord) -> anyhow::Result<()>;

    /// Delete a record. Unknown hashes are ignored.
    async fn remove(&self, hash: &InfoHash) -> anyhow::Result<()>;

    /// Every stored record.
    async fn load_all(&self) -> anyhow::Result<Vec<TorrentRecord>>;
}

/// Best-effort media metadata lookup keyed on a display name.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Search for `display_name`. Callers ignore every error.
    async fn search(&self, display_name: &str) -> anyhow::Result<MediaMetadata>;
}

/// Media-discovery service toggled after library mutations.
#[async_trait]
pub trait MediaDiscovery: Send + Sync {
    /// Stop advertising the library. No-op by default.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Start advertising the library again.
    async fn start(&self) -> anyhow::Result<()>;
}

/// Workflow façade exposed to the HTTP layer for torrent lifecycle control.
#[async_trait]
pub trait TorrentWorkflow: Send + Sync {
    /// Register a torrent and return its pre-metadata snapshot immediately.
    async fn add(&self, request: AddTorrentRequest) -> TorrentResult<TorrentSnapshot>;

    /// Add with persistence, then materialize and drop on a fixed cadence.
    async fn add_for_media_server(
        &self,
        request: AddTorrentRequest,
    ) -> TorrentResult<TorrentSnapshot>;

    /// Snapshot for a single torrent.
    async fn get(&self, hash: &InfoHash) -> TorrentResult<TorrentSnapshot>;

    /// Update descriptive fields.
    async fn set(&self, hash: &InfoHash, patch: DescriptivePatch) -> TorrentResult<()>;

    /// Clean up the materialized tree and discard the torrent.
    async fn remove(&self, hash: &InfoHash) -> TorrentResult<()>;

    /// Snapshots for every torrent; empty when there are none.
    async fn list(&self) -> TorrentResult<Vec<TorrentSnapshot>>;

    /// Evict a torrent from the engine without touching persisted state.
    async fn drop_torrent(&self, hash: &InfoHash) -> TorrentResult<()>;

    /// Remove every listed torrent.
    async fn wipe(&self) -> TorrentResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MinimalEngine {
        forgotten: Mutex<Vec<InfoHash>>,
    }

    #[async_trait]
    impl TorrentEngine for MinimalEngine {
        async fn register(
            &self,
            spec: TorrentSpec,
            _options: RegisterOptions,
        ) -> anyhow::Result<TorrentRecord> {
            Ok(TorrentRecord::new(spec.info_hash, "name"))
        }

        async fn find(&self, _hash: &InfoHash) -> Option<TorrentRecord> {
            None
        }

        async fn list(&self) -> Vec<TorrentRecord> {
            Vec::new()
        }

        async fn update(&self, _record: &TorrentRecord) -> anyhow::Result<()> {
            Ok(())
        }

        async fn record_materialization(
            &self,
            hash: &InfoHash,
            _root: &Path,
        ) -> anyhow::Result<TorrentRecord> {
            bail!("no record for {hash}")
        }

        async fn forget(&self, hash: &InfoHash) -> anyhow::Result<()> {
            self.forgotten
                .lock()
                .expect("forgotten lock")
                .push(hash.clone());
            Ok(())
        }

        async fn wait_for_metadata(&self, hash: &InfoHash) -> anyhow::Result<TorrentRecord> {
            bail!("no metadata for {hash}")
        }
    }

    struct Discovery;

    #[async_trait]
    impl MediaDiscovery for Discovery {
        async fn start(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_engine_methods_report_unsupported() {
        let engine = MinimalEngine {
            forgotten: Mutex::new(Vec::new()),
        };
        let hash: InfoHash = "a".repeat(40).parse().expect("hash");

        assert!(engine.pause(&hash).await.is_err());
        assert!(engine.reload(&hash).await.is_err());
        assert!(engine.restore(Vec::new()).await.is_err());

        engine.forget(&hash).await.expect("forget");
        assert_eq!(
            engine.forgotten.lock().expect("forgotten lock").as_slice(),
            &[hash]
        );
    }

    #[tokio::test]
    async fn discovery_stop_defaults_to_noop() {
        assert!(Discovery.stop().await.is_ok());
        assert!(Discovery.start().await.is_ok());
    }
}
