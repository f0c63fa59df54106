//! Shared state handed to every handler.

use std::sync::Arc;

use torrlib_telemetry::Metrics;
use torrlib_torrent_core::TorrentWorkflow;

pub(crate) struct ApiState {
    pub(crate) workflow: Arc<dyn TorrentWorkflow>,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    pub(crate) fn new(workflow: Arc<dyn TorrentWorkflow>, telemetry: Metrics) -> Self {
        Self {
            workflow,
            telemetry,
        }
    }
}
