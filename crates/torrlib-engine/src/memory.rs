//! Record table and readiness signalling.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, watch};
use torrlib_torrent_core::{
    FileEntry, InfoHash, MetainfoFile, MimeClass, RegisterOptions, TorrentEngine,
    TorrentLifecycle, TorrentRecord, TorrentSpec,
};
use tracing::{debug, info};

struct Slot {
    record: TorrentRecord,
    selection: Option<Vec<u32>>,
    ready: watch::Sender<bool>,
}

#[derive(Default)]
struct Table {
    slots: HashMap<InfoHash, Slot>,
    order: Vec<InfoHash>,
}

impl Table {
    fn slot_mut(&mut self, hash: &InfoHash) -> Result<&mut Slot> {
        self.slots
            .get_mut(hash)
            .ok_or_else(|| anyhow!("torrent {hash} is not registered"))
    }

    fn insert(&mut self, record: TorrentRecord, selection: Option<Vec<u32>>) -> TorrentRecord {
        let (ready, _) = watch::channel(record.lifecycle.has_metadata());
        let hash = record.hash.clone();
        let snapshot = record.clone();
        self.slots.insert(
            hash.clone(),
            Slot {
                record,
                selection,
                ready,
            },
        );
        self.order.push(hash);
        snapshot
    }
}

/// Engine keeping every record in memory.
#[derive(Default)]
pub struct MemoryEngine {
    table: RwLock<Table>,
}

impl MemoryEngine {
    /// Empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver metadata for a pending torrent, waking every waiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the hash is not registered.
    pub async fn resolve_metadata(
        &self,
        hash: &InfoHash,
        name: &str,
        files: Vec<MetainfoFile>,
    ) -> Result<TorrentRecord> {
        let mut table = self.table.write().await;
        let slot = table.slot_mut(hash)?;
        if !name.trim().is_empty() {
            slot.record.name = name.to_string();
        }
        slot.record.files = file_entries(&files, slot.selection.as_deref());
        slot.record.lifecycle = TorrentLifecycle::InfoReady;
        slot.record.updated_at = Utc::now();
        slot.ready.send_replace(true);
        info!(hash = %hash, files = slot.record.files.len(), "metadata resolved");
        Ok(slot.record.clone())
    }
}

fn file_entries(files: &[MetainfoFile], selection: Option<&[u32]>) -> Vec<FileEntry> {
    files
        .iter()
        .zip(1u32..)
        .map(|(file, index)| FileEntry {
            index,
            path: file.path.clone(),
            length: file.length,
            mime: MimeClass::from_path(&file.path),
            selected: selection.is_none_or(|chosen| chosen.contains(&index)),
        })
        .collect()
}

fn apply_options(record: &mut TorrentRecord, options: &RegisterOptions) {
    for (slot, value) in [
        (&mut record.title, &options.title),
        (&mut record.poster, &options.poster),
        (&mut record.category, &options.category),
        (&mut record.data, &options.data),
        (&mut record.custom_dir, &options.custom_dir),
    ] {
        if !value.trim().is_empty() {
            slot.clone_from(value);
        }
    }
}

#[async_trait]
impl TorrentEngine for MemoryEngine {
    async fn register(&self, spec: TorrentSpec, options: RegisterOptions) -> Result<TorrentRecord> {
        let mut table = self.table.write().await;
        if let Some(slot) = table.slots.get_mut(&spec.info_hash) {
            apply_options(&mut slot.record, &options);
            slot.record.updated_at = Utc::now();
            debug!(hash = %spec.info_hash, "torrent already registered; refreshed descriptive fields");
            return Ok(slot.record.clone());
        }

        let name = spec
            .metainfo
            .as_ref()
            .map(|metainfo| metainfo.name.clone())
            .or_else(|| spec.display_name.clone())
            .unwrap_or_else(|| spec.info_hash.to_string());
        let trackers = spec.trackers.len();
        let mut record = TorrentRecord::new(spec.info_hash, name);
        apply_options(&mut record, &options);
        if let Some(metainfo) = &spec.metainfo {
            record.files = file_entries(&metainfo.files, options.selected_files.as_deref());
            record.lifecycle = TorrentLifecycle::InfoReady;
        } else {
            record.lifecycle = TorrentLifecycle::InfoPending;
        }
        info!(
            hash = %record.hash,
            lifecycle = ?record.lifecycle,
            trackers,
            "torrent registered"
        );
        Ok(table.insert(record, options.selected_files))
    }

    async fn find(&self, hash: &InfoHash) -> Option<TorrentRecord> {
        self.table
            .read()
            .await
            .slots
            .get(hash)
            .map(|slot| slot.record.clone())
    }

    async fn list(&self) -> Vec<TorrentRecord> {
        let table = self.table.read().await;
        table
            .order
            .iter()
            .filter_map(|hash| table.slots.get(hash))
            .map(|slot| slot.record.clone())
            .collect()
    }

    async fn update(&self, record: &TorrentRecord) -> Result<()> {
        let mut table = self.table.write().await;
        let slot = table.slot_mut(&record.hash)?;
        let current = &mut slot.record;
        current.title.clone_from(&record.title);
        current.poster.clone_from(&record.poster);
        current.category.clone_from(&record.category);
        current.data.clone_from(&record.data);
        current.custom_dir.clone_from(&record.custom_dir);
        current.materialized_path.clone_from(&record.materialized_path);
        if record.lifecycle == TorrentLifecycle::PersistedToStore && current.lifecycle.has_metadata()
        {
            current.lifecycle = TorrentLifecycle::PersistedToStore;
        }
        current.updated_at = Utc::now();
        Ok(())
    }

    async fn record_materialization(&self, hash: &InfoHash, root: &Path) -> Result<TorrentRecord> {
        let mut table = self.table.write().await;
        let record = &mut table.slot_mut(hash)?.record;
        record.materialized_path = Some(root.to_path_buf());
        if record.lifecycle.has_metadata() {
            record.lifecycle = TorrentLifecycle::PersistedToStore;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn forget(&self, hash: &InfoHash) -> Result<()> {
        let mut table = self.table.write().await;
        if table.slots.remove(hash).is_some() {
            table.order.retain(|known| known != hash);
            info!(hash = %hash, "torrent forgotten");
        }
        Ok(())
    }

    async fn wait_for_metadata(&self, hash: &InfoHash) -> Result<TorrentRecord> {
        let mut ready = {
            let table = self.table.read().await;
            let slot = table
                .slots
                .get(hash)
                .ok_or_else(|| anyhow!("torrent {hash} is not registered"))?;
            slot.ready.subscribe()
        };
        ready
            .wait_for(|ready| *ready)
            .await
            .map_err(|_| anyhow!("torrent {hash} was removed before metadata arrived"))?;
        self.find(hash)
            .await
            .ok_or_else(|| anyhow!("torrent {hash} was removed before metadata arrived"))
    }

    async fn pause(&self, hash: &InfoHash) -> Result<()> {
        let mut table = self.table.write().await;
        let slot = table.slot_mut(hash)?;
        slot.record.lifecycle = TorrentLifecycle::LoadedFromStore;
        slot.record.updated_at = Utc::now();
        slot.ready.send_replace(false);
        info!(hash = %hash, "torrent paused");
        Ok(())
    }

    async fn reload(&self, hash: &InfoHash) -> Result<TorrentRecord> {
        let mut table = self.table.write().await;
        let slot = table.slot_mut(hash)?;
        if slot.record.lifecycle != TorrentLifecycle::LoadedFromStore {
            return Ok(slot.record.clone());
        }
        if slot.record.files.is_empty() {
            slot.record.lifecycle = TorrentLifecycle::InfoPending;
        } else {
            slot.record.lifecycle = TorrentLifecycle::InfoReady;
            slot.ready.send_replace(true);
        }
        slot.record.updated_at = Utc::now();
        info!(hash = %hash, lifecycle = ?slot.record.lifecycle, "torrent reloaded");
        Ok(slot.record.clone())
    }

    async fn restore(&self, records: Vec<TorrentRecord>) -> Result<()> {
        let mut table = self.table.write().await;
        for mut record in records {
            if table.slots.contains_key(&record.hash) {
                bail!("torrent {} restored twice", record.hash);
            }
            record.lifecycle = TorrentLifecycle::LoadedFromStore;
            let selection = if record.files.iter().all(|file| file.selected) {
                None
            } else {
                Some(
                    record
                        .files
                        .iter()
                        .filter(|file| file.selected)
                        .map(|file| file.index)
                        .collect(),
                )
            };
            table.insert(record, selection);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use torrlib_torrent_core::Metainfo;

    fn hash(seed: char) -> InfoHash {
        seed.to_string().repeat(40).parse().expect("hash")
    }

    fn magnet_spec(seed: char, name: &str) -> TorrentSpec {
        TorrentSpec {
            info_hash: hash(seed),
            display_name: Some(name.to_string()),
            trackers: Vec::new(),
            metainfo: None,
        }
    }

    fn files(paths: &[&str]) -> Vec<MetainfoFile> {
        paths
            .iter()
            .map(|path| MetainfoFile {
                path: (*path).to_string(),
                length: 10,
            })
            .collect()
    }

    #[tokio::test]
    async fn metainfo_specs_are_ready_immediately() -> Result<()> {
        let engine = MemoryEngine::new();
        let spec = TorrentSpec {
            metainfo: Some(Metainfo {
                name: "Pack".to_string(),
                files: files(&["Pack/a.mkv", "Pack/b.nfo", "Pack/c.mp3"]),
            }),
            ..magnet_spec('a', "ignored")
        };
        let options = RegisterOptions {
            selected_files: Some(vec![1, 3]),
            title: "Title".to_string(),
            ..RegisterOptions::default()
        };

        let record = engine.register(spec, options).await?;
        assert_eq!(record.name, "Pack");
        assert_eq!(record.title, "Title");
        assert_eq!(record.lifecycle, TorrentLifecycle::InfoReady);
        let summary: Vec<_> = record
            .files
            .iter()
            .map(|file| (file.index, file.mime, file.selected))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, MimeClass::Video, true),
                (2, MimeClass::Generic, false),
                (3, MimeClass::Audio, true)
            ]
        );

        let ready = tokio::time::timeout(Duration::from_secs(1), engine.wait_for_metadata(&record.hash))
            .await??;
        assert_eq!(ready.files.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn magnet_specs_wait_for_resolution() -> Result<()> {
        let engine = Arc::new(MemoryEngine::new());
        let record = engine
            .register(magnet_spec('b', "Show"), RegisterOptions::default())
            .await?;
        assert_eq!(record.lifecycle, TorrentLifecycle::InfoPending);

        let waiter = {
            let engine = Arc::clone(&engine);
            let hash = record.hash.clone();
            tokio::spawn(async move { engine.wait_for_metadata(&hash).await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        engine
            .resolve_metadata(&record.hash, "Show.S01", files(&["Show.S01/E01.mkv"]))
            .await?;
        let ready = tokio::time::timeout(Duration::from_secs(1), waiter).await???;
        assert_eq!(ready.name, "Show.S01");
        assert_eq!(ready.lifecycle, TorrentLifecycle::InfoReady);
        assert_eq!(ready.files[0].index, 1);
        Ok(())
    }

    #[tokio::test]
    async fn forgetting_wakes_waiters_with_an_error() -> Result<()> {
        let engine = Arc::new(MemoryEngine::new());
        let record = engine
            .register(magnet_spec('c', "Gone"), RegisterOptions::default())
            .await?;
        let waiter = {
            let engine = Arc::clone(&engine);
            let hash = record.hash.clone();
            tokio::spawn(async move { engine.wait_for_metadata(&hash).await })
        };
        tokio::task::yield_now().await;
        engine.forget(&record.hash).await?;
        let outcome = tokio::time::timeout(Duration::from_secs(1), waiter).await??;
        assert!(outcome.is_err());
        assert!(engine.list().await.is_empty());
        engine.forget(&record.hash).await?;
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_registration_refreshes_descriptive_fields() -> Result<()> {
        let engine = MemoryEngine::new();
        engine
            .register(magnet_spec('d', "Name"), RegisterOptions::default())
            .await?;
        let again = engine
            .register(
                magnet_spec('d', "Name"),
                RegisterOptions {
                    poster: "http://poster".to_string(),
                    ..RegisterOptions::default()
                },
            )
            .await?;
        assert_eq!(again.poster, "http://poster");
        assert_eq!(engine.list().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn update_keeps_engine_owned_fields() -> Result<()> {
        let engine = MemoryEngine::new();
        let record = engine
            .register(magnet_spec('e', "Name"), RegisterOptions::default())
            .await?;
        let mut stale = record.clone();
        engine
            .resolve_metadata(&record.hash, "", files(&["a.mkv"]))
            .await?;

        stale.title = "New".to_string();
        stale.lifecycle = TorrentLifecycle::PersistedToStore;
        engine.update(&stale).await?;
        let current = engine.find(&record.hash).await.expect("record");
        assert_eq!(current.title, "New");
        assert_eq!(current.files.len(), 1);
        assert_eq!(current.lifecycle, TorrentLifecycle::PersistedToStore);
        Ok(())
    }

    #[tokio::test]
    async fn materialization_write_back_keeps_concurrent_edits() -> Result<()> {
        let engine = MemoryEngine::new();
        let record = engine
            .register(magnet_spec('9', "Name"), RegisterOptions::default())
            .await?;
        engine
            .resolve_metadata(&record.hash, "", files(&["a.mkv"]))
            .await?;

        let mut edited = engine.find(&record.hash).await.expect("record");
        edited.title = "Edited".to_string();
        edited.category = "movies".to_string();
        engine.update(&edited).await?;

        let root = Path::new("/library/torrFilms/Name");
        let updated = engine.record_materialization(&record.hash, root).await?;
        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.category, "movies");
        assert_eq!(updated.materialized_path.as_deref(), Some(root));
        assert_eq!(updated.lifecycle, TorrentLifecycle::PersistedToStore);
        assert_eq!(engine.find(&record.hash).await, Some(updated));

        let pending = engine
            .register(magnet_spec('8', "Pending"), RegisterOptions::default())
            .await?;
        let still_pending = engine.record_materialization(&pending.hash, root).await?;
        assert_eq!(still_pending.lifecycle, TorrentLifecycle::InfoPending);
        assert!(engine.record_materialization(&hash('7'), root).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn pause_reload_and_restore_cycle() -> Result<()> {
        let engine = MemoryEngine::new();
        let mut stored = TorrentRecord::new(hash('f'), "Stored");
        stored.files = file_entries(&files(&["x.mkv", "y.mkv"]), Some(&[2][..]));
        engine.restore(vec![stored.clone()]).await?;
        assert!(engine.restore(vec![stored]).await.is_err());

        let dormant = engine.find(&hash('f')).await.expect("restored");
        assert_eq!(dormant.lifecycle, TorrentLifecycle::LoadedFromStore);

        let reloaded = engine.reload(&hash('f')).await?;
        assert_eq!(reloaded.lifecycle, TorrentLifecycle::InfoReady);
        assert!(!reloaded.files[0].selected);
        engine.wait_for_metadata(&hash('f')).await?;

        engine.pause(&hash('f')).await?;
        let paused = engine.find(&hash('f')).await.expect("paused");
        assert_eq!(paused.lifecycle, TorrentLifecycle::LoadedFromStore);
        assert!(engine.pause(&hash('0')).await.is_err());
        Ok(())
    }
}
