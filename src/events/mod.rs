//! Event Stream (C10) — spec.md §4.7.
//!
//! Ordered, sequenced event emission with levels and grouping. The module
//! has three parts, mirroring the teacher's layout:
//!
//! 1. **Event types** (`types.rs`): the fixed `RuntimeEvent` catalog
//!    (`agent.task.progress`, `tool.call.*`, `patch.*`, `conflict.*`,
//!    `quality.gate.updated`, `autonomy.*`, `render.pipeline.stage`,
//!    `run.*`), each carrying `sequence`, `timestamp`, `level`, and optional
//!    `groupId`/`parentId`.
//! 2. **Event bus** (`bus.rs`): Tokio broadcast-based pub/sub that stamps
//!    each event with the next sequence number.
//! 3. **Event history** (`history.rs`): in-memory replay/query surface
//!    (SPEC_FULL.md §B.2) — no persistence backend, events live for the
//!    run's lifetime only.
//!
//! Sinks are out of scope (spec.md §4.7); delivery preserves sequence order
//! within a run.

pub mod bus;
pub mod history;
pub mod types;

pub use bus::{EventBus, EventBusError, EventBusExt, EventBusResult, EventFilter, FilteredReceiver, SharedEventBus};
pub use history::{EventHistory, EventStats, ReplayStats, SharedEventHistory};
pub use types::{EventLevel, RuntimeEvent, RuntimeEventKind};
