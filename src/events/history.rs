//! Event history and replay (SPEC_FULL.md §B.2).
//!
//! An in-memory, run-scoped log of every `RuntimeEvent` emitted — no
//! persistence backend is implied; events live for the run's lifetime only,
//! consistent with the Blackboard's lifecycle (spec.md §3). Grounded on the
//! teacher's `EventHistory`/`ReplayStats`/`EventStats`/`ReplayBuilder`
//! (range queries, session/task-scoped queries, replay-through-callback,
//! aggregate stats) — adapted from a RocksDB-backed store to a plain
//! `Vec<RuntimeEvent>` behind a mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use super::types::RuntimeEvent;

pub type SharedEventHistory = Arc<EventHistory>;

/// Records every event emitted during a run and answers range/task-scoped
/// queries over it.
pub struct EventHistory {
    events: Mutex<Vec<RuntimeEvent>>,
}

impl EventHistory {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn shared(self) -> SharedEventHistory {
        Arc::new(self)
    }

    /// Append an event to the log. Events are expected to arrive in
    /// `sequence` order (the `EventBus` guarantees this); out-of-order
    /// appends are still stored, just not re-sorted.
    pub fn record(&self, event: RuntimeEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// All events in `[start_sequence, end_sequence]` inclusive.
    pub fn events_in_range(&self, start_sequence: u64, end_sequence: u64) -> Vec<RuntimeEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.sequence >= start_sequence && e.sequence <= end_sequence)
            .cloned()
            .collect()
    }

    /// Every event recorded so far with `sequence > after`.
    pub fn events_since(&self, after: u64) -> Vec<RuntimeEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.sequence > after)
            .cloned()
            .collect()
    }

    /// All events recorded so far, in emission order.
    pub fn all_events(&self) -> Vec<RuntimeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events pertaining to a specific task (spec.md's `taskId` correlation).
    pub fn task_events(&self, task_id: &str) -> Vec<RuntimeEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.task_id() == Some(task_id))
            .cloned()
            .collect()
    }

    /// Events pertaining to a specific wave.
    pub fn wave_events(&self, wave_id: u32) -> Vec<RuntimeEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.wave_id() == Some(wave_id))
            .cloned()
            .collect()
    }

    /// Replay every recorded event through `callback`, in emission order.
    pub async fn replay<F, Fut>(&self, mut callback: F) -> ReplayStats
    where
        F: FnMut(RuntimeEvent) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let events = self.all_events();
        let total = events.len();
        info!(total, "starting event replay");

        let mut stats = ReplayStats::default();
        for event in events {
            stats.record_event(&event);
            callback(event).await;
        }

        info!(
            total = stats.total_events,
            tasks = stats.tasks_seen,
            errors = stats.errors_seen,
            "event replay complete"
        );
        stats
    }

    pub fn stats(&self) -> EventStats {
        EventStats::from_events(&self.all_events())
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters accumulated while replaying a log (teacher's `ReplayStats`).
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_events: usize,
    pub tasks_seen: usize,
    pub errors_seen: usize,
    tasks: std::collections::HashSet<String>,
}

impl ReplayStats {
    pub fn record_event(&mut self, event: &RuntimeEvent) {
        self.total_events += 1;
        if let Some(task_id) = event.task_id() {
            if self.tasks.insert(task_id.to_string()) {
                self.tasks_seen += 1;
            }
        }
        if event.type_name() == "run.error" || event.type_name() == "tool.call.failed" {
            self.errors_seen += 1;
        }
    }
}

/// Aggregate counts over a set of events (teacher's `EventStats`).
#[derive(Debug, Default, serde::Serialize)]
pub struct EventStats {
    pub total_events: usize,
    pub events_by_type: HashMap<String, usize>,
    pub unique_tasks: usize,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
    pub tool_calls_failed: usize,
}

impl EventStats {
    pub fn from_events(events: &[RuntimeEvent]) -> Self {
        let mut stats = Self::default();
        let mut tasks = std::collections::HashSet::new();

        for event in events {
            stats.total_events += 1;
            *stats
                .events_by_type
                .entry(event.type_name().to_string())
                .or_insert(0) += 1;

            if let Some(task_id) = event.task_id() {
                tasks.insert(task_id.to_string());
            }

            match event.type_name() {
                "conflict.detected" => stats.conflicts_detected += 1,
                "conflict.resolved" => stats.conflicts_resolved += 1,
                "tool.call.failed" => stats.tool_calls_failed += 1,
                _ => {}
            }
        }

        stats.unique_tasks = tasks.len();
        stats
    }
}
