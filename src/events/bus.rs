//! Event bus (spec.md §4.7): pub/sub over `RuntimeEvent` with a per-run
//! monotonic sequence counter.
//!
//! Grounded on the teacher's `EventBus` (Tokio broadcast channel, optional
//! RocksDB persistence, `EventFilter`/`FilteredReceiver` for selective
//! subscription). Persistence is dropped here: SPEC_FULL.md §B.2 notes
//! events live only for the run's lifetime, with `EventHistory` (in-memory)
//! as the sole replay surface — no sink or storage backend is implied by
//! spec.md §4.7, which explicitly puts sinks out of scope.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use super::types::{EventLevel, RuntimeEvent, RuntimeEventKind};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("failed to publish event: {0}")]
    SendFailed(String),
}

pub type EventBusResult<T> = Result<T, EventBusError>;

/// Shared reference to an `EventBus`.
pub type SharedEventBus = Arc<EventBus>;

/// Broadcasts `RuntimeEvent`s and stamps each with a strictly increasing
/// `sequence` (spec.md §4.7, §8 property 7: "sequence numbers are strictly
/// increasing across all events in a run").
pub struct EventBus {
    sender: broadcast::Sender<RuntimeEvent>,
    next_sequence: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            next_sequence: AtomicU64::new(1),
        }
    }

    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Emit an event at `level`, stamping it with the next sequence number
    /// and the current timestamp. Returns the stamped event so the caller
    /// can also append it to an `EventHistory`.
    pub fn emit(&self, level: EventLevel, kind: RuntimeEventKind) -> RuntimeEvent {
        self.emit_grouped(level, kind, None, None)
    }

    /// Emit an event carrying correlation ids (spec.md §4.7 `groupId`/
    /// `parentId`) — e.g. every event within one wave shares a `groupId`.
    pub fn emit_grouped(
        &self,
        level: EventLevel,
        kind: RuntimeEventKind,
        group_id: Option<String>,
        parent_id: Option<String>,
    ) -> RuntimeEvent {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let event = RuntimeEvent {
            sequence,
            timestamp: Utc::now(),
            level,
            group_id,
            parent_id,
            kind,
        };
        let event_type = event.type_name();
        match self.sender.send(event.clone()) {
            Ok(count) => debug!(event_type, receivers = count, sequence, "event published"),
            Err(_) => debug!(event_type, sequence, "event published (no receivers)"),
        }
        event
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Selective-subscription filter (spec.md §4.7's `groupId`/`type`
/// correlation use case).
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub task_id: Option<String>,
    pub type_names: Option<Vec<String>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, task_id: &str) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }

    pub fn types(mut self, type_names: Vec<&str>) -> Self {
        self.type_names = Some(type_names.into_iter().map(String::from).collect());
        self
    }

    pub fn matches(&self, event: &RuntimeEvent) -> bool {
        if let Some(ref tid) = self.task_id {
            if event.task_id() != Some(tid.as_str()) {
                return false;
            }
        }
        if let Some(ref types) = self.type_names {
            if !types.iter().any(|t| t == event.type_name()) {
                return false;
            }
        }
        true
    }
}

/// A `broadcast::Receiver` that only yields events matching a filter.
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<RuntimeEvent>,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub fn new(receiver: broadcast::Receiver<RuntimeEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    pub async fn recv(&mut self) -> Result<RuntimeEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}

pub trait EventBusExt {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver;
}

impl EventBusExt for EventBus {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}

impl EventBusExt for SharedEventBus {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}
