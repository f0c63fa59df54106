//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::net::TcpListener;
use torrlib_telemetry::{Metrics, build_sha};
use torrlib_torrent_core::TorrentWorkflow;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::http::constants::MAX_METAINFO_BYTES;
use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::http::torrents::handlers::{add_for_media_server, dispatch_action, upload_torrent};
use crate::state::ApiState;

/// Axum router wrapper that hosts the torrent library API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the API with the workflow façade and metrics registry wired
    /// through shared state.
    #[must_use]
    pub fn new(workflow: Arc<dyn TorrentWorkflow>, telemetry: Metrics) -> Self {
        let state = Arc::new(ApiState::new(workflow, telemetry.clone()));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path();
                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    let status = response.status().as_u16();
                    span.record("status_code", status);
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::public_routes()
            .merge(Self::torrent_routes())
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    fn torrent_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/torrents", post(dispatch_action))
            .route("/torrents/library", post(add_for_media_server))
            .route(
                "/torrent/upload",
                post(upload_torrent).layer(DefaultBodyLimit::max(MAX_METAINFO_BYTES)),
            )
    }

    /// Serve the API using the configured router on the supplied address.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        tracing::info!("Starting API on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router.into_make_service()).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}
