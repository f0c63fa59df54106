//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters follow the torrent lifecycle: additions, stream-reference writes,
//!   cleanup failures, and metadata timeouts.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use prometheus::core::Collector;
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    torrents_added_total: IntCounter,
    stream_refs_written_total: IntCounter,
    stream_ref_failures_total: IntCounter,
    cleanup_failures_total: IntCounter,
    metadata_timeouts_total: IntCounter,
    background_tasks_active: IntGauge,
}

/// Snapshot of selected gauges and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Torrents accepted by add.
    pub torrents_added_total: u64,
    /// Stream-reference files written.
    pub stream_refs_written_total: u64,
    /// Stream-reference files that could not be written.
    pub stream_ref_failures_total: u64,
    /// Library cleanups that left something behind.
    pub cleanup_failures_total: u64,
    /// Metadata waits that hit their deadline.
    pub metadata_timeouts_total: u64,
    /// Background lifecycle tasks currently running.
    pub background_tasks_active: i64,
}

fn collector<T>(name: &'static str, built: prometheus::Result<T>) -> Result<T> {
    built.map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

fn counter(registry: &Registry, name: &'static str, help: &str) -> Result<IntCounter> {
    let counter = collector(name, IntCounter::with_opts(Opts::new(name, help)))?;
    register(registry, name, &counter)?;
    Ok(counter)
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = collector(
            "http_requests_total",
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            ),
        )?;
        register(&registry, "http_requests_total", &http_requests_total)?;
        let events_emitted_total = collector(
            "events_emitted_total",
            IntCounterVec::new(
                Opts::new("events_emitted_total", "Domain events emitted by type"),
                &["type"],
            ),
        )?;
        register(&registry, "events_emitted_total", &events_emitted_total)?;

        let torrents_added_total = counter(
            &registry,
            "torrents_added_total",
            "Torrents accepted by the add operations",
        )?;
        let stream_refs_written_total = counter(
            &registry,
            "stream_refs_written_total",
            "Stream-reference files written to the library",
        )?;
        let stream_ref_failures_total = counter(
            &registry,
            "stream_ref_failures_total",
            "Stream-reference files that could not be written",
        )?;
        let cleanup_failures_total = counter(
            &registry,
            "cleanup_failures_total",
            "Library cleanups that failed to remove a path",
        )?;
        let metadata_timeouts_total = counter(
            &registry,
            "metadata_timeouts_total",
            "Metadata waits that reached their deadline",
        )?;
        let background_tasks_active = collector(
            "background_tasks_active",
            IntGauge::with_opts(Opts::new(
                "background_tasks_active",
                "Background lifecycle tasks currently running",
            )),
        )?;
        register(&registry, "background_tasks_active", &background_tasks_active)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                events_emitted_total,
                torrents_added_total,
                stream_refs_written_total,
                stream_ref_failures_total,
                cleanup_failures_total,
                metadata_timeouts_total,
                background_tasks_active,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Count an accepted torrent.
    pub fn inc_torrent_added(&self) {
        self.inner.torrents_added_total.inc();
    }

    /// Record the outcome of one materialization pass.
    pub fn record_stream_refs(&self, written: usize, failed: usize) {
        self.inner
            .stream_refs_written_total
            .inc_by(u64::try_from(written).unwrap_or(u64::MAX));
        self.inner
            .stream_ref_failures_total
            .inc_by(u64::try_from(failed).unwrap_or(u64::MAX));
    }

    /// Count a cleanup that left something behind.
    pub fn inc_cleanup_failure(&self) {
        self.inner.cleanup_failures_total.inc();
    }

    /// Count a metadata wait that timed out.
    pub fn inc_metadata_timeout(&self) {
        self.inner.metadata_timeouts_total.inc();
    }

    /// Mark a background task as started.
    pub fn task_started(&self) {
        self.inner.background_tasks_active.inc();
    }

    /// Mark a background task as finished.
    pub fn task_finished(&self) {
        self.inner.background_tasks_active.dec();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the lifecycle counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            torrents_added_total: self.inner.torrents_added_total.get(),
            stream_refs_written_total: self.inner.stream_refs_written_total.get(),
            stream_ref_failures_total: self.inner.stream_ref_failures_total.get(),
            cleanup_failures_total: self.inner.cleanup_failures_total.get(),
            metadata_timeouts_total: self.inner.metadata_timeouts_total.get(),
            background_tasks_active: self.inner.background_tasks_active.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_feed_snapshot_and_render() {
        let metrics = Metrics::new().expect("metrics");
        metrics.inc_torrent_added();
        metrics.record_stream_refs(3, 1);
        metrics.inc_cleanup_failure();
        metrics.inc_metadata_timeout();
        metrics.task_started();
        metrics.task_started();
        metrics.task_finished();
        metrics.inc_http_request("/torrents", 200);
        metrics.inc_event("torrent_added");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.torrents_added_total, 1);
        assert_eq!(snapshot.stream_refs_written_total, 3);
        assert_eq!(snapshot.stream_ref_failures_total, 1);
        assert_eq!(snapshot.cleanup_failures_total, 1);
        assert_eq!(snapshot.metadata_timeouts_total, 1);
        assert_eq!(snapshot.background_tasks_active, 1);

        let rendered = metrics.render().expect("render");
        assert!(rendered.contains("torrents_added_total 1"));
        assert!(rendered.contains("stream_refs_written_total 3"));
        assert!(rendered.contains("http_requests_total{code=\"200\",route=\"/torrents\"} 1"));
    }

    #[test]
    fn registries_are_independent() {
        let first = Metrics::new().expect("first");
        let second = Metrics::new().expect("second");
        first.inc_torrent_added();
        assert_eq!(second.snapshot().torrents_added_total, 0);
    }
}
