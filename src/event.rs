//! Structured events emitted for every ingestion milestone.
//!
//! Ingestion failures never reach the caller after retries run out; this
//! stream is where they become observable. Subscribe to build alerting or a
//! dead-letter store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::model::IngestId;

/// A structured ingestion event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Queued {
        id: IngestId,
        target_id: String,
        source: String,
    },
    AttemptStarted {
        id: IngestId,
        attempt: u32,
    },
    AttemptFailed {
        id: IngestId,
        attempt: u32,
        error: String,
        retryable: bool,
    },
    Attached {
        id: IngestId,
        attempt: u32,
        resource_url: String,
    },
    /// Final failure. The ingestion is discarded.
    Abandoned {
        id: IngestId,
        input: String,
        target_id: String,
        attempts: u32,
        error: String,
    },
}

/// Fan-out point for events. Without a subscriber, events are dropped.
#[derive(Debug, Default)]
pub struct EventSink {
    seq: AtomicU64,
    subscriber: Option<mpsc::UnboundedSender<Event>>,
}

impl EventSink {
    pub fn new(subscriber: Option<mpsc::UnboundedSender<Event>>) -> Self {
        Self {
            seq: AtomicU64::new(0),
            subscriber,
        }
    }

    pub fn emit(&self, kind: EventKind) {
        let Some(ref subscriber) = self.subscriber else {
            return;
        };
        let event = Event {
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            kind,
        };
        // A closed subscriber must never fail an ingestion.
        let _ = subscriber.send(event);
    }
}
