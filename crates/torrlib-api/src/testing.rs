//! Recording workflow shared by handler and router tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use torrlib_telemetry::Metrics;
use torrlib_torrent_core::{
    AddTorrentRequest, DescriptivePatch, InfoHash, TorrentError, TorrentRecord, TorrentResult,
    TorrentSnapshot, TorrentSource, TorrentWorkflow,
};

use crate::state::ApiState;

pub(crate) const HASH: &str = "c9e15763f722f23e98a29decdfae341b98d53056";

#[derive(Default)]
pub(crate) struct RecordingWorkflow {
    calls: Mutex<Vec<&'static str>>,
    adds: Mutex<Vec<AddTorrentRequest>>,
    fail_registration: bool,
}

impl RecordingWorkflow {
    pub(crate) fn failing_registration() -> Self {
        Self {
            fail_registration: true,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn last_add(&self) -> Option<AddTorrentRequest> {
        self.adds.lock().expect("adds lock").last().cloned()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn accept(&self, request: AddTorrentRequest) -> TorrentResult<TorrentSnapshot> {
        if self.fail_registration {
            return Err(TorrentError::Registration {
                source: "engine offline".into(),
            });
        }
        let hash: InfoHash = match &request.source {
            TorrentSource::Link(link) => link.parse()?,
            TorrentSource::File(_) => HASH.parse()?,
        };
        self.adds.lock().expect("adds lock").push(request);
        Ok(TorrentRecord::new(hash, "Movie.2020").snapshot())
    }
}

#[async_trait]
impl TorrentWorkflow for RecordingWorkflow {
    async fn add(&self, request: AddTorrentRequest) -> TorrentResult<TorrentSnapshot> {
        self.record("add");
        self.accept(request)
    }

    async fn add_for_media_server(
        &self,
        request: AddTorrentRequest,
    ) -> TorrentResult<TorrentSnapshot> {
        self.record("add_for_media_server");
        self.accept(request)
    }

    async fn get(&self, hash: &InfoHash) -> TorrentResult<TorrentSnapshot> {
        self.record("get");
        Err(TorrentError::NotFound {
            hash: hash.to_string(),
        })
    }

    async fn set(&self, _hash: &InfoHash, _patch: DescriptivePatch) -> TorrentResult<()> {
        self.record("set");
        Ok(())
    }

    async fn remove(&self, _hash: &InfoHash) -> TorrentResult<()> {
        self.record("remove");
        Ok(())
    }

    async fn list(&self) -> TorrentResult<Vec<TorrentSnapshot>> {
        self.record("list");
        Ok(Vec::new())
    }

    async fn drop_torrent(&self, _hash: &InfoHash) -> TorrentResult<()> {
        self.record("drop");
        Ok(())
    }

    async fn wipe(&self) -> TorrentResult<()> {
        self.record("wipe");
        Ok(())
    }
}

pub(crate) fn api_state(workflow: Arc<RecordingWorkflow>) -> Arc<ApiState> {
    Arc::new(ApiState::new(
        workflow,
        Metrics::new().expect("metrics registry"),
    ))
}
