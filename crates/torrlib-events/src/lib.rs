#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Lifecycle event bus for the torrent library.
//!
//! The bus provides a typed event enum, sequential identifiers, and replay of
//! recent events for subscribers that attach late (the discovery observer, test
//! harnesses). Internally it uses `tokio::broadcast` with a bounded buffer; when
//! the channel overflows, the oldest events are dropped.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Identifier assigned to each published event.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed lifecycle events surfaced by the orchestrator.
///
/// Torrents are identified by their lowercase hex info-hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A torrent was registered with the engine.
    TorrentAdded {
        /// Info-hash of the torrent.
        hash: String,
        /// Engine-resolved or display name at registration time.
        name: String,
    },
    /// The engine reported metadata for a torrent.
    MetadataReady {
        /// Info-hash of the torrent.
        hash: String,
    },
    /// Waiting for metadata exceeded the configured ceiling.
    MetadataTimedOut {
        /// Info-hash of the torrent.
        hash: String,
    },
    /// The record was written to the torrent store.
    TorrentPersisted {
        /// Info-hash of the torrent.
        hash: String,
    },
    /// Stream-reference files were written for a torrent.
    LibraryMaterialized {
        /// Info-hash of the torrent.
        hash: String,
        /// Root directory holding the torrent's stream references.
        root: PathBuf,
        /// Number of stream-reference files written.
        files: usize,
    },
    /// A torrent's materialized tree was removed.
    LibraryCleaned {
        /// Info-hash of the torrent.
        hash: String,
    },
    /// Descriptive fields were changed.
    TorrentUpdated {
        /// Info-hash of the torrent.
        hash: String,
    },
    /// A torrent was removed from the engine.
    TorrentRemoved {
        /// Info-hash of the torrent.
        hash: String,
    },
    /// A torrent was evicted from the engine but kept in the store.
    TorrentDropped {
        /// Info-hash of the torrent.
        hash: String,
    },
    /// Every listed torrent was removed.
    LibraryWiped {
        /// Number of torrents that were removed.
        count: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator used for metrics labels and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TorrentAdded { .. } => "torrent_added",
            Self::MetadataReady { .. } => "metadata_ready",
            Self::MetadataTimedOut { .. } => "metadata_timed_out",
            Self::TorrentPersisted { .. } => "torrent_persisted",
            Self::LibraryMaterialized { .. } => "library_materialized",
            Self::LibraryCleaned { .. } => "library_cleaned",
            Self::TorrentUpdated { .. } => "torrent_updated",
            Self::TorrentRemoved { .. } => "torrent_removed",
            Self::TorrentDropped { .. } => "torrent_dropped",
            Self::LibraryWiped { .. } => "library_wiped",
        }
    }

    /// Whether the event reflects a user-visible mutation of the library.
    ///
    /// Media discovery is restarted after these.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::TorrentAdded { .. } | Self::TorrentRemoved { .. } | Self::LibraryWiped { .. }
        )
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Publication time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// The broadcast channel uses the same capacity as the replay buffer.
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.lock_buffer();
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.lock_buffer();
            backlog.extend(buffer.iter().filter(|item| item.id > since).cloned());
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any events have been published.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_buffer().back().map(|event| event.id)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events either from the replay backlog or from the
/// live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    ///
    /// Lagged receivers skip the dropped events and continue with the oldest
    /// retained one.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
