//! Torrent lifecycle orchestrator that coordinates metadata arrival with the
//! stream-reference library and the torrent store.
//!
//! # Design
//! - `add` answers immediately; a detached task per torrent waits for
//!   metadata, persists, and materializes.
//! - Every task runs under a per-torrent cancellation token that `remove` and
//!   `drop` cancel, so pending work never re-creates a tree that cleanup just
//!   removed. A hash's token is released once its last task finishes.
//! - Background failures are logged and counted, never returned to callers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use torrlib_config::{AppConfig, LifecycleTimings};
use torrlib_events::{Event, EventBus};
use torrlib_library::Library;
use torrlib_telemetry::Metrics;
use torrlib_torrent_core::{
    AddTorrentRequest, DescriptivePatch, InfoHash, MediaMetadata, MetadataLookup,
    RegisterOptions, TorrentEngine, TorrentError, TorrentLifecycle, TorrentRecord, TorrentResult,
    TorrentSnapshot, TorrentStore, TorrentWorkflow,
};
use tracing::{debug, error, info, warn};

use crate::sources::SourceResolver;

/// Upper bound on the synchronous metadata lookup performed by `add`.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

const TRACKER_NOISE: &str = "rutor.info";

/// Collaborators the orchestrator drives.
pub struct OrchestratorDeps {
    /// Torrent engine owning the records.
    pub engine: Arc<dyn TorrentEngine>,
    /// Durable store; `None` disables persistence.
    pub store: Option<Arc<dyn TorrentStore>>,
    /// Best-effort metadata lookup; `None` disables it.
    pub lookup: Option<Arc<dyn MetadataLookup>>,
    /// Stream-reference library; `None` disables materialization and cleanup.
    pub library: Option<Library>,
    /// Link and upload resolver.
    pub sources: SourceResolver,
    /// Lifecycle event bus.
    pub events: EventBus,
    /// Metrics registry.
    pub metrics: Metrics,
}

/// Behavioural switches injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Materialize after every add once metadata arrives.
    pub auto_materialize: bool,
    /// Stream host override.
    pub public_host: Option<String>,
    /// Stream host used when neither an override nor a request origin exists.
    pub fallback_host: String,
    /// Background lifecycle timings.
    pub timings: LifecycleTimings,
}

impl OrchestratorSettings {
    /// Derive settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            auto_materialize: config.library.auto_materialize,
            public_host: config.library.public_host.clone(),
            fallback_host: format!("http://127.0.0.1:{}", config.http.port),
            timings: config.timings,
        }
    }

    fn stream_host(&self, origin: Option<&str>) -> String {
        self.public_host
            .as_deref()
            .or(origin)
            .unwrap_or(&self.fallback_host)
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowUp {
    /// Plain add: materialize only when automatic materialization is on.
    Standard,
    /// Media-server composite: materialize, then drop.
    MediaServer,
}

/// What the background task needs to know about the original request.
#[derive(Debug, Clone)]
struct LifecyclePlan {
    hash: InfoHash,
    display_name: Option<String>,
    persist: bool,
    host: String,
}

/// Parent token for a hash plus the number of tasks still holding a child.
struct LifecycleSlot {
    token: CancellationToken,
    live: usize,
}

struct Shared {
    engine: Arc<dyn TorrentEngine>,
    store: Option<Arc<dyn TorrentStore>>,
    lookup: Option<Arc<dyn MetadataLookup>>,
    library: Option<Library>,
    sources: SourceResolver,
    events: EventBus,
    metrics: Metrics,
    settings: OrchestratorSettings,
    tokens: Mutex<HashMap<InfoHash, LifecycleSlot>>,
}

/// Torrent workflow façade backing the HTTP surface.
#[derive(Clone)]
pub struct TorrentOrchestrator {
    shared: Arc<Shared>,
}

impl TorrentOrchestrator {
    /// Construct an orchestrator from its collaborators and settings.
    #[must_use]
    pub fn new(deps: OrchestratorDeps, settings: OrchestratorSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine: deps.engine,
                store: deps.store,
                lookup: deps.lookup,
                library: deps.library,
                sources: deps.sources,
                events: deps.events,
                metrics: deps.metrics,
                settings,
                tokens: Mutex::new(HashMap::new()),
            }),
        }
    }

    async fn admit(
        &self,
        mut request: AddTorrentRequest,
        follow_up: FollowUp,
    ) -> TorrentResult<TorrentSnapshot> {
        let shared = &self.shared;
        let spec = shared.sources.resolve(&request.source).await?;

        if request.title.is_none()
            && let Some(name) = spec.display_name.as_deref()
            && let Some(found) = shared.lookup_metadata(name).await
        {
            request.title = Some(found.title);
            if request.poster.is_none() {
                request.poster = found.poster_url;
            }
        }

        let options = RegisterOptions {
            title: request.title.clone().unwrap_or_default(),
            poster: request.poster.clone().unwrap_or_default(),
            category: request.category.clone().unwrap_or_default(),
            data: request.data.clone().unwrap_or_default(),
            custom_dir: request.custom_dir.clone().unwrap_or_default(),
            selected_files: request.selected_files.clone(),
        };
        let display_name = spec.display_name.clone();
        let record = shared
            .engine
            .register(spec, options)
            .await
            .map_err(|err| TorrentError::Registration { source: err.into() })?;

        shared.metrics.inc_torrent_added();
        shared.publish(Event::TorrentAdded {
            hash: record.hash.to_string(),
            name: record.name.clone(),
        });
        info!(hash = %record.hash, name = %record.name, "torrent registered");

        let plan = LifecyclePlan {
            hash: record.hash.clone(),
            display_name,
            persist: request.persist,
            host: shared.settings.stream_host(request.origin.as_deref()),
        };
        let token = shared.lifecycle_token(&record.hash);
        tokio::spawn(Arc::clone(shared).run_lifecycle(plan, follow_up, token));

        Ok(record.snapshot())
    }
}

impl Shared {
    fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        self.events.publish(event);
    }

    fn lock_tokens(&self) -> MutexGuard<'_, HashMap<InfoHash, LifecycleSlot>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lifecycle_token(&self, hash: &InfoHash) -> CancellationToken {
        let mut tokens = self.lock_tokens();
        let slot = tokens
            .entry(hash.clone())
            .or_insert_with(|| LifecycleSlot {
                token: CancellationToken::new(),
                live: 0,
            });
        slot.live += 1;
        slot.token.child_token()
    }

    /// A cancelled child means its slot was already taken out by
    /// `cancel_lifecycle`; the slot under the same hash, if any, is newer.
    fn release_lifecycle(&self, hash: &InfoHash, token: &CancellationToken) {
        if token.is_cancelled() {
            return;
        }
        let mut tokens = self.lock_tokens();
        if let Some(slot) = tokens.get_mut(hash) {
            slot.live = slot.live.saturating_sub(1);
            if slot.live == 0 {
                tokens.remove(hash);
            }
        }
    }

    fn cancel_lifecycle(&self, hash: &InfoHash) {
        if let Some(slot) = self.lock_tokens().remove(hash) {
            slot.token.cancel();
            debug!(hash = %hash, "pending lifecycle work cancelled");
        }
    }

    async fn lookup_metadata(&self, display_name: &str) -> Option<MediaMetadata> {
        let lookup = self.lookup.as_ref()?;
        match timeout(LOOKUP_TIMEOUT, lookup.search(display_name)).await {
            Ok(Ok(found)) => {
                debug!(title = %found.title, "metadata lookup matched");
                Some(found)
            }
            Ok(Err(err)) => {
                debug!(error = %err, "metadata lookup failed");
                None
            }
            Err(_) => {
                debug!(display_name, "metadata lookup timed out");
                None
            }
        }
    }

    async fn run_lifecycle(
        self: Arc<Self>,
        plan: LifecyclePlan,
        follow_up: FollowUp,
        token: CancellationToken,
    ) {
        self.metrics.task_started();
        tokio::select! {
            () = token.cancelled() => {
                debug!(hash = %plan.hash, "lifecycle task stopped by cancellation");
            }
            () = self.drive(&plan, follow_up) => {}
        }
        self.release_lifecycle(&plan.hash, &token);
        self.metrics.task_finished();
    }

    async fn drive(&self, plan: &LifecyclePlan, follow_up: FollowUp) {
        let timings = self.settings.timings;
        if follow_up == FollowUp::MediaServer {
            // The composite cadence is fixed; it does not wait for metadata.
            tokio::join!(
                self.await_metadata(plan),
                self.media_server_cadence(plan, timings)
            );
            return;
        }

        if self.await_metadata(plan).await
            && self.settings.auto_materialize
            && self.library.is_some()
        {
            sleep(timings.materialize_delay).await;
            self.materialize(&plan.hash, &plan.host).await;
        }
    }

    /// Wait for metadata, settle the title, and persist. Returns whether
    /// metadata arrived.
    async fn await_metadata(&self, plan: &LifecyclePlan) -> bool {
        let waited = timeout(
            self.settings.timings.metadata_wait,
            self.engine.wait_for_metadata(&plan.hash),
        )
        .await;
        let mut record = match waited {
            Ok(Ok(record)) => record,
            Ok(Err(err)) => {
                warn!(hash = %plan.hash, error = %err, "metadata wait aborted");
                return false;
            }
            Err(_) => {
                warn!(hash = %plan.hash, "timed out waiting for torrent metadata");
                self.metrics.inc_metadata_timeout();
                self.publish(Event::MetadataTimedOut {
                    hash: plan.hash.to_string(),
                });
                return false;
            }
        };
        self.publish(Event::MetadataReady {
            hash: plan.hash.to_string(),
        });

        if record.title.trim().is_empty() {
            record.title = fallback_title(plan.display_name.as_deref(), &record.name);
        }
        if plan.persist {
            record.lifecycle = TorrentLifecycle::PersistedToStore;
        }
        if let Err(err) = self.engine.update(&record).await {
            warn!(hash = %plan.hash, error = %err, "failed to write back torrent title");
            return true;
        }
        if plan.persist {
            self.persist(&record).await;
        }
        true
    }

    async fn media_server_cadence(&self, plan: &LifecyclePlan, timings: LifecycleTimings) {
        sleep(timings.media_server_delay).await;
        self.materialize(&plan.hash, &plan.host).await;
        sleep(timings.pre_drop_delay).await;
        match self.evict(&plan.hash).await {
            Ok(()) => info!(hash = %plan.hash, "torrent dropped after publishing references"),
            Err(err) => warn!(hash = %plan.hash, error = %err, "automatic drop failed"),
        }
    }

    async fn persist(&self, record: &TorrentRecord) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match store.upsert(record).await {
            Ok(()) => self.publish(Event::TorrentPersisted {
                hash: record.hash.to_string(),
            }),
            Err(err) => warn!(hash = %record.hash, error = %err, "failed to persist torrent"),
        }
    }

    async fn materialize(&self, hash: &InfoHash, host: &str) {
        let Some(library) = self.library.clone() else {
            debug!(hash = %hash, "library not configured; skipping materialization");
            return;
        };
        let Some(mut record) = self.engine.find(hash).await else {
            debug!(hash = %hash, "torrent gone before materialization");
            return;
        };
        if record.lifecycle == TorrentLifecycle::LoadedFromStore {
            record = match self.engine.reload(hash).await {
                Ok(record) => record,
                Err(err) => {
                    warn!(hash = %hash, error = %err, "failed to reload dormant torrent");
                    return;
                }
            };
        }
        if !record.lifecycle.has_metadata() {
            warn!(hash = %hash, "metadata not available; nothing to materialize");
            return;
        }

        let host = host.to_string();
        let outcome = task::spawn_blocking(move || library.materialize(&mut record, &host)).await;
        let report = match outcome {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                warn!(hash = %hash, error = %err, "torrent layout rejected; nothing written");
                return;
            }
            Err(err) => {
                error!(hash = %hash, error = %err, "materialization task failed");
                return;
            }
        };

        self.metrics
            .record_stream_refs(report.written.len(), report.failures.len());
        match self.engine.record_materialization(hash, &report.root).await {
            Ok(record) => self.persist(&record).await,
            Err(err) => warn!(hash = %hash, error = %err, "failed to record materialized path"),
        }
        self.publish(Event::LibraryMaterialized {
            hash: hash.to_string(),
            root: report.root,
            files: report.written.len(),
        });
    }

    async fn cleanup(&self, record: TorrentRecord) {
        let Some(library) = self.library.clone() else {
            return;
        };
        let hash = record.hash.clone();
        match task::spawn_blocking(move || library.cleanup(&record)).await {
            Ok(report) => {
                if !report.is_clean() {
                    self.metrics.inc_cleanup_failure();
                }
                self.publish(Event::LibraryCleaned {
                    hash: hash.to_string(),
                });
            }
            Err(err) => {
                self.metrics.inc_cleanup_failure();
                error!(hash = %hash, error = %err, "cleanup task failed");
            }
        }
    }

    async fn remove(&self, hash: &InfoHash) -> TorrentResult<()> {
        if self.discard(hash).await? {
            self.publish(Event::TorrentRemoved {
                hash: hash.to_string(),
            });
        }
        Ok(())
    }

    /// Cancel, clean up, forget, and unstore one torrent without announcing
    /// it. Returns whether the torrent was known.
    async fn discard(&self, hash: &InfoHash) -> TorrentResult<bool> {
        self.cancel_lifecycle(hash);
        let Some(record) = self.engine.find(hash).await else {
            debug!(hash = %hash, "remove requested for unknown torrent");
            return Ok(false);
        };

        self.cleanup(record).await;
        self.engine
            .forget(hash)
            .await
            .map_err(|err| TorrentError::operation("forget", Some(hash.to_string()), err))?;
        if let Some(store) = self.store.as_ref() {
            store.remove(hash).await.map_err(|err| {
                TorrentError::operation("store_remove", Some(hash.to_string()), err)
            })?;
        }
        info!(hash = %hash, "torrent removed");
        Ok(true)
    }

    async fn evict(&self, hash: &InfoHash) -> TorrentResult<()> {
        if self.engine.find(hash).await.is_none() {
            debug!(hash = %hash, "drop requested for unknown torrent");
            return Ok(());
        }
        self.engine
            .pause(hash)
            .await
            .map_err(|err| TorrentError::operation("pause", Some(hash.to_string()), err))?;
        self.publish(Event::TorrentDropped {
            hash: hash.to_string(),
        });
        // Cancel last: the media-server cadence evicts from inside its own task.
        self.cancel_lifecycle(hash);
        Ok(())
    }
}

/// Title used when none was supplied: the cleaned display name, else the
/// engine name.
pub(crate) fn fallback_title(display_name: Option<&str>, engine_name: &str) -> String {
    let cleaned = display_name
        .map(|name| name.replace(TRACKER_NOISE, "").replace('_', " "))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    cleaned.unwrap_or_else(|| engine_name.to_string())
}

#[async_trait]
impl TorrentWorkflow for TorrentOrchestrator {
    async fn add(&self, request: AddTorrentRequest) -> TorrentResult<TorrentSnapshot> {
        self.admit(request, FollowUp::Standard).await
    }

    async fn add_for_media_server(
        &self,
        mut request: AddTorrentRequest,
    ) -> TorrentResult<TorrentSnapshot> {
        request.persist = true;
        self.admit(request, FollowUp::MediaServer).await
    }

    async fn get(&self, hash: &InfoHash) -> TorrentResult<TorrentSnapshot> {
        self.shared
            .engine
            .find(hash)
            .await
            .map(|record| record.snapshot())
            .ok_or_else(|| TorrentError::NotFound {
                hash: hash.to_string(),
            })
    }

    async fn set(&self, hash: &InfoHash, patch: DescriptivePatch) -> TorrentResult<()> {
        let shared = &self.shared;
        let Some(mut record) = shared.engine.find(hash).await else {
            info!(hash = %hash, "set requested for unknown torrent; ignoring");
            return Ok(());
        };
        if !record.apply_patch(&patch) {
            return Ok(());
        }
        shared
            .engine
            .update(&record)
            .await
            .map_err(|err| TorrentError::operation("update", Some(hash.to_string()), err))?;
        if record.lifecycle == TorrentLifecycle::PersistedToStore
            && let Some(store) = shared.store.as_ref()
        {
            store.upsert(&record).await.map_err(|err| {
                TorrentError::operation("store_upsert", Some(hash.to_string()), err)
            })?;
        }
        shared.publish(Event::TorrentUpdated {
            hash: hash.to_string(),
        });
        Ok(())
    }

    async fn remove(&self, hash: &InfoHash) -> TorrentResult<()> {
        self.shared.remove(hash).await
    }

    async fn list(&self) -> TorrentResult<Vec<TorrentSnapshot>> {
        Ok(self
            .shared
            .engine
            .list()
            .await
            .iter()
            .map(TorrentRecord::snapshot)
            .collect())
    }

    async fn drop_torrent(&self, hash: &InfoHash) -> TorrentResult<()> {
        self.shared.cancel_lifecycle(hash);
        self.shared.evict(hash).await
    }

    async fn wipe(&self) -> TorrentResult<()> {
        let records = self.shared.engine.list().await;
        let mut removed = 0usize;
        // Announced once, as `LibraryWiped`.
        for record in records {
            match self.shared.discard(&record.hash).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => warn!(hash = %record.hash, error = %err, "wipe could not remove torrent"),
            }
        }
        self.shared.publish(Event::LibraryWiped { count: removed });
        info!(count = removed, "library wiped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use torrlib_config::loader::{ENV_HTTP_PORT, ENV_LIBRARY_AUTO_CREATE, ENV_PUBLIC_HOST};
    use torrlib_engine::MemoryEngine;
    use torrlib_torrent_core::TorrentSource;

    fn config(public_host: Option<&'static str>) -> AppConfig {
        AppConfig::from_lookup(|name| match name {
            ENV_HTTP_PORT => Some("8090".to_string()),
            ENV_LIBRARY_AUTO_CREATE => Some("true".to_string()),
            ENV_PUBLIC_HOST => public_host.map(str::to_string),
            _ => None,
        })
        .expect("config loads")
    }

    #[test]
    fn fallback_title_strips_tracker_noise() {
        assert_eq!(
            fallback_title(Some("rutor.info_Some_Show_S01"), "engine"),
            "Some Show S01"
        );
        assert_eq!(fallback_title(Some(" rutor.info __ "), "engine"), "engine");
        assert_eq!(fallback_title(None, "Engine.Name"), "Engine.Name");
    }

    #[test]
    fn stream_host_prefers_override_then_origin() {
        let settings = OrchestratorSettings::from_config(&config(None));
        assert_eq!(settings.stream_host(None), "http://127.0.0.1:8090");
        assert_eq!(
            settings.stream_host(Some("http://nas:8090/")),
            "http://nas:8090"
        );

        let settings = OrchestratorSettings::from_config(&config(Some("https://media.example")));
        assert_eq!(
            settings.stream_host(Some("http://nas:8090")),
            "https://media.example"
        );
        assert!(settings.auto_materialize);
        assert_eq!(settings.timings, LifecycleTimings::default());
    }

    fn detached(engine: Arc<MemoryEngine>) -> TorrentOrchestrator {
        TorrentOrchestrator::new(
            OrchestratorDeps {
                engine,
                store: None,
                lookup: None,
                library: None,
                sources: SourceResolver::new(Client::new()),
                events: EventBus::with_capacity(16),
                metrics: Metrics::new().expect("metrics"),
            },
            OrchestratorSettings {
                auto_materialize: false,
                public_host: None,
                fallback_host: "http://127.0.0.1:8090".to_string(),
                timings: LifecycleTimings {
                    metadata_wait: Duration::from_millis(50),
                    ..LifecycleTimings::uniform(Duration::from_millis(5))
                },
            },
        )
    }

    fn tracked_lifecycles(orchestrator: &TorrentOrchestrator) -> usize {
        orchestrator.shared.lock_tokens().len()
    }

    #[tokio::test]
    async fn lifecycle_tokens_are_released_when_tasks_finish() -> anyhow::Result<()> {
        let engine = Arc::new(MemoryEngine::new());
        let orchestrator = detached(engine.clone());
        let ready: InfoHash = "a".repeat(40).parse()?;
        let stalled: InfoHash = "b".repeat(40).parse()?;
        let dropped: InfoHash = "c".repeat(40).parse()?;

        for hash in [&ready, &stalled, &dropped] {
            orchestrator
                .add(AddTorrentRequest::new(TorrentSource::Link(hash.to_string())))
                .await?;
        }
        assert_eq!(tracked_lifecycles(&orchestrator), 3);

        orchestrator.drop_torrent(&dropped).await?;
        assert_eq!(tracked_lifecycles(&orchestrator), 2);
        engine.resolve_metadata(&ready, "Film", Vec::new()).await?;

        timeout(Duration::from_secs(3), async {
            while tracked_lifecycles(&orchestrator) > 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await?;
        assert_eq!(orchestrator.list().await?.len(), 3);
        Ok(())
    }
}
