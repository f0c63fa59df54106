//! Media-discovery restarts driven by library mutations.
//!
//! # Design
//! - The orchestrator never calls discovery directly; it publishes events and
//!   this observer reacts to the mutating ones.
//! - Failures are logged and the observer keeps running.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tokio::task::JoinHandle;
use torrlib_events::EventBus;
use torrlib_torrent_core::MediaDiscovery;
use tracing::{debug, info, warn};

/// Ceiling for the refresh request sent to the media server.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Discovery implementation that asks a media server to rescan its library.
#[derive(Debug, Clone)]
pub struct HttpRefreshDiscovery {
    client: Client,
    refresh_url: String,
}

impl HttpRefreshDiscovery {
    /// Discovery posting to `refresh_url` on every start.
    #[must_use]
    pub fn new(client: Client, refresh_url: impl Into<String>) -> Self {
        Self {
            client,
            refresh_url: refresh_url.into(),
        }
    }
}

#[async_trait]
impl MediaDiscovery for HttpRefreshDiscovery {
    async fn start(&self) -> anyhow::Result<()> {
        self.client
            .post(&self.refresh_url)
            .timeout(REFRESH_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("library refresh request to {} failed", self.refresh_url))?;
        debug!(url = %self.refresh_url, "media server refresh requested");
        Ok(())
    }
}

/// Spawn the observer restarting `discovery` after every mutating event.
pub fn spawn_discovery_observer(
    events: &EventBus,
    discovery: Arc<dyn MediaDiscovery>,
) -> JoinHandle<()> {
    let mut stream = events.subscribe(None);
    tokio::spawn(async move {
        info!("media discovery observer started");
        while let Some(envelope) = stream.next().await {
            if !envelope.event.is_mutation() {
                continue;
            }
            debug!(event = envelope.event.kind(), "restarting media discovery");
            if let Err(err) = discovery.stop().await {
                warn!(error = %err, "failed to stop media discovery");
            }
            if let Err(err) = discovery.start().await {
                warn!(error = %err, "failed to start media discovery");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use axum::Router;
    use axum::routing::post;
    use tokio::net::TcpListener;
    use tokio::time::{sleep, timeout};
    use torrlib_events::Event;

    #[derive(Default)]
    struct RecordingDiscovery {
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingDiscovery {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl MediaDiscovery for RecordingDiscovery {
        async fn stop(&self) -> anyhow::Result<()> {
            self.calls.lock().expect("calls lock").push("stop");
            Ok(())
        }

        async fn start(&self) -> anyhow::Result<()> {
            self.calls.lock().expect("calls lock").push("start");
            Ok(())
        }
    }

    #[tokio::test]
    async fn mutations_restart_discovery() -> anyhow::Result<()> {
        let events = EventBus::with_capacity(16);
        let discovery = Arc::new(RecordingDiscovery::default());
        let observer = spawn_discovery_observer(&events, discovery.clone());

        events.publish(Event::TorrentUpdated {
            hash: "0".repeat(40),
        });
        events.publish(Event::TorrentRemoved {
            hash: "0".repeat(40),
        });

        timeout(Duration::from_secs(1), async {
            while discovery.calls().len() < 2 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await?;
        assert_eq!(discovery.calls(), vec!["stop", "start"]);
        observer.abort();
        Ok(())
    }

    #[tokio::test]
    async fn refresh_posts_to_media_server() -> anyhow::Result<()> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/library/refresh",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ""
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let discovery =
            HttpRefreshDiscovery::new(Client::new(), format!("http://{addr}/library/refresh"));
        discovery.stop().await?;
        discovery.start().await?;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let missing = HttpRefreshDiscovery::new(Client::new(), format!("http://{addr}/nope"));
        assert!(missing.start().await.is_err());
        Ok(())
    }
}
