use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Client;
use tokio::fs;
use tokio::task::JoinHandle;
use torrlib_api::ApiServer;
use torrlib_config::{AppConfig, LogOutput, LoggingSettings};
use torrlib_engine::MemoryEngine;
use torrlib_events::EventBus;
use torrlib_library::Library;
use torrlib_metadata::TmdbClient;
use torrlib_runtime::RuntimeStore;
use torrlib_telemetry::{LogFormat, LoggingConfig, Metrics};
use torrlib_torrent_core::{
    MediaDiscovery, MetadataLookup, TorrentEngine, TorrentStore, TorrentWorkflow,
};
use tracing::{info, warn};

use crate::discovery::{HttpRefreshDiscovery, spawn_discovery_observer};
use crate::error::{AppError, AppResult};
use crate::orchestrator::{OrchestratorDeps, OrchestratorSettings, TorrentOrchestrator};
use crate::sources::SourceResolver;

/// Dependencies required to bootstrap the torrent library service.
pub(crate) struct BootstrapDependencies {
    config: AppConfig,
    client: Client,
    events: EventBus,
    telemetry: Metrics,
    engine: Arc<dyn TorrentEngine>,
    store: Arc<dyn TorrentStore>,
    lookup: Option<Arc<dyn MetadataLookup>>,
    discovery: Option<Arc<dyn MediaDiscovery>>,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        Self::from_config(config)
    }

    /// Construct dependencies from an already loaded configuration.
    pub(crate) fn from_config(config: AppConfig) -> AppResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| AppError::Http {
                operation: "http_client.build",
                source,
            })?;
        let events = EventBus::new();
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

        let lookup = config.metadata.tmdb_api_key.as_ref().map(|key| {
            Arc::new(TmdbClient::new(
                client.clone(),
                key.clone(),
                config.metadata.language.clone(),
            )) as Arc<dyn MetadataLookup>
        });
        let discovery = config.discovery.refresh_url.as_ref().map(|url| {
            Arc::new(HttpRefreshDiscovery::new(client.clone(), url.clone()))
                as Arc<dyn MediaDiscovery>
        });

        Ok(Self {
            store: Arc::new(RuntimeStore::new(config.store_path.clone())),
            engine: Arc::new(MemoryEngine::new()),
            config,
            client,
            events,
            telemetry,
            lookup,
            discovery,
        })
    }
}

/// Fully wired service, ready to listen.
pub(crate) struct Application {
    api: ApiServer,
    addr: SocketAddr,
    orchestrator: TorrentOrchestrator,
    observer: Option<JoinHandle<()>>,
}

/// Entry point for the torrent library boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    torrlib_telemetry::init_logging(&LoggingConfig {
        level: &dependencies.config.logging.level,
        format: log_format(&dependencies.config.logging),
        ..LoggingConfig::default()
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    info!("torrent library bootstrap starting");

    let Application {
        api,
        addr,
        orchestrator,
        observer,
    } = assemble(dependencies).await?;

    let tracked = orchestrator.list().await.map_or(0, |torrents| torrents.len());
    info!(addr = %addr, torrents = tracked, "Launching API listener");
    let serve_result = api.serve(addr).await;

    if let Some(observer) = observer {
        observer.abort();
        if let Err(err) = observer.await
            && !err.is_cancelled()
        {
            warn!(error = %err, "discovery observer join failed");
        }
    }

    serve_result.map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

/// Restore persisted state and wire the orchestrator behind the API.
pub(crate) async fn assemble(dependencies: BootstrapDependencies) -> AppResult<Application> {
    let BootstrapDependencies {
        config,
        client,
        events,
        telemetry,
        engine,
        store,
        lookup,
        discovery,
    } = dependencies;

    let library = match config.library.root.as_ref() {
        Some(root) => {
            fs::create_dir_all(root)
                .await
                .map_err(|source| AppError::Io {
                    operation: "library.create_root",
                    path: Some(root.clone()),
                    source,
                })?;
            info!(root = %root.display(), "stream-reference library ready");
            Some(Library::new(root.clone()))
        }
        None => {
            warn!("library root not configured; materialization disabled");
            None
        }
    };

    let records = store
        .load_all()
        .await
        .map_err(|err| AppError::store("store.load_all", err))?;
    let restored = records.len();
    engine
        .restore(records)
        .await
        .map_err(|err| AppError::engine("engine.restore", err))?;
    info!(count = restored, "restored persisted torrents");

    let observer = match (config.discovery.restart_on_mutation, discovery) {
        (true, Some(discovery)) => Some(spawn_discovery_observer(&events, discovery)),
        (true, None) => {
            warn!("discovery restart requested without a refresh URL; ignoring");
            None
        }
        (false, _) => None,
    };

    let orchestrator = TorrentOrchestrator::new(
        OrchestratorDeps {
            engine,
            store: Some(store),
            lookup,
            library,
            sources: SourceResolver::new(client),
            events,
            metrics: telemetry.clone(),
        },
        OrchestratorSettings::from_config(&config),
    );
    let workflow: Arc<dyn TorrentWorkflow> = Arc::new(orchestrator.clone());
    let api = ApiServer::new(workflow, telemetry);

    Ok(Application {
        api,
        addr: config.http.socket_addr(),
        orchestrator,
        observer,
    })
}

fn log_format(settings: &LoggingSettings) -> LogFormat {
    match settings.output {
        Some(LogOutput::Json) => LogFormat::Json,
        Some(LogOutput::Pretty) => LogFormat::Pretty,
        None => LogFormat::infer(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;
    use torrlib_config::loader::{
        ENV_DISCOVERY_REFRESH_URL, ENV_DISCOVERY_RESTART, ENV_LIBRARY_ROOT, ENV_STORE_PATH,
    };
    use torrlib_torrent_core::{InfoHash, TorrentLifecycle, TorrentRecord};

    const HASH: &str = "c9e15763f722f23e98a29decdfae341b98d53056";

    fn config(root: &Path, restart: bool) -> anyhow::Result<AppConfig> {
        let library = root.join("library").display().to_string();
        let store = root.join("store.json").display().to_string();
        Ok(AppConfig::from_lookup(|name| match name {
            ENV_LIBRARY_ROOT => Some(library.clone()),
            ENV_STORE_PATH => Some(store.clone()),
            ENV_DISCOVERY_RESTART => Some(restart.to_string()),
            ENV_DISCOVERY_REFRESH_URL => Some("http://127.0.0.1:9/refresh".to_string()),
            _ => None,
        })?)
    }

    #[test]
    fn log_format_follows_configured_output() {
        let mut settings = LoggingSettings {
            level: "info".to_string(),
            output: Some(LogOutput::Json),
        };
        assert_eq!(log_format(&settings), LogFormat::Json);
        settings.output = Some(LogOutput::Pretty);
        assert_eq!(log_format(&settings), LogFormat::Pretty);
        settings.output = None;
        assert_eq!(log_format(&settings), LogFormat::infer());
    }

    #[tokio::test]
    async fn assemble_restores_store_and_creates_library_root() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let config = config(temp.path(), true)?;

        let hash: InfoHash = HASH.parse()?;
        let mut record = TorrentRecord::new(hash.clone(), "Film");
        record.lifecycle = TorrentLifecycle::PersistedToStore;
        RuntimeStore::new(config.store_path.clone())
            .upsert(&record)
            .await?;

        let app = assemble(BootstrapDependencies::from_config(config)?).await?;
        assert!(temp.path().join("library").is_dir());
        assert_eq!(app.addr.port(), 8090);

        let snapshot = app.orchestrator.get(&hash).await?;
        assert_eq!(snapshot.hash, HASH);

        let observer = app.observer.expect("observer spawned");
        observer.abort();
        Ok(())
    }

    #[tokio::test]
    async fn observer_is_skipped_unless_restart_requested() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let app = assemble(BootstrapDependencies::from_config(config(temp.path(), false)?)?).await?;
        assert!(app.observer.is_none());
        assert!(app.orchestrator.list().await?.is_empty());
        Ok(())
    }
}
