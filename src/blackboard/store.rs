//! The Blackboard (C2) — process-local shared state for a single run.
//!
//! Grounded on the teacher's `state/store.rs` handle shape (`open`/`shared`,
//! a lock-guarded inner, one setter/getter pair per entity) but reimplemented
//! as a plain in-memory structure: spec.md §3 calls the Blackboard
//! "process-local" and §3's Lifecycle section says it is "discarded" at run
//! end rather than persisted. All writes go through explicit setters and all
//! access is serialized behind a single `RwLock`, matching the "one
//! writer/many readers... serialized by the Orchestrator's cooperative
//! scheduler" policy in spec.md §5.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::blackboard::types::{GateName, QualityGateState};
use crate::patch::{ConflictRecord, PatchIntent};
use crate::plan::{ExecutionPlan, TaskId};
use crate::session::SessionDocument;

/// Shared handle to a run's Blackboard.
pub type SharedBlackboard = Arc<Blackboard>;

#[derive(Default)]
struct Inner {
    tasks_started: Vec<TaskId>,
    patch_intents: HashMap<String, PatchIntent>,
    conflicts: HashMap<String, ConflictRecord>,
    quality_gates: HashMap<GateName, QualityGateState>,
    generated_components: Vec<String>,
    failed_tasks: Vec<TaskId>,
    session_documents: Vec<SessionDocument>,
    plan: Option<ExecutionPlan>,
}

/// Shared in-memory state container for one orchestration run.
pub struct Blackboard {
    inner: RwLock<Inner>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn shared() -> SharedBlackboard {
        Arc::new(Self::new())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("blackboard lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("blackboard lock poisoned")
    }

    // -- plan / session documents --------------------------------------

    pub fn set_plan(&self, plan: ExecutionPlan) {
        self.write().plan = Some(plan);
    }

    pub fn plan(&self) -> Option<ExecutionPlan> {
        self.read().plan.clone()
    }

    pub fn set_session_documents(&self, docs: Vec<SessionDocument>) {
        self.write().session_documents = docs;
    }

    pub fn session_documents(&self) -> Vec<SessionDocument> {
        self.read().session_documents.clone()
    }

    // -- tasks ------------------------------------------------------------

    pub fn record_task_started(&self, id: TaskId) {
        self.write().tasks_started.push(id);
    }

    pub fn record_task_failed(&self, id: TaskId) {
        self.write().failed_tasks.push(id);
    }

    pub fn failed_tasks(&self) -> Vec<TaskId> {
        self.read().failed_tasks.clone()
    }

    pub fn record_generated_component(&self, file_path: impl Into<String>) {
        self.write().generated_components.push(file_path.into());
    }

    pub fn generated_components(&self) -> Vec<String> {
        self.read().generated_components.clone()
    }

    // -- patch intents ------------------------------------------------------

    pub fn put_intents(&self, intents: impl IntoIterator<Item = PatchIntent>) {
        let mut inner = self.write();
        for intent in intents {
            inner.patch_intents.insert(intent.id.clone(), intent);
        }
    }

    pub fn all_intents(&self) -> Vec<PatchIntent> {
        let mut intents: Vec<_> = self.read().patch_intents.values().cloned().collect();
        intents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        intents
    }

    /// The latest surviving content per file path across *all* merged
    /// intents seen so far — the accumulated artifact set the Artifact
    /// Analyzer and final output operate on.
    pub fn workspace_snapshot(&self) -> HashMap<String, String> {
        let mut snapshot = HashMap::new();
        for intent in self.all_intents() {
            snapshot.insert(intent.file_path.clone(), intent.content.clone());
        }
        snapshot
    }

    // -- conflicts ------------------------------------------------------

    pub fn put_conflicts(&self, conflicts: impl IntoIterator<Item = ConflictRecord>) {
        let mut inner = self.write();
        for conflict in conflicts {
            inner.conflicts.insert(conflict.id.clone(), conflict);
        }
    }

    pub fn open_conflicts(&self) -> Vec<ConflictRecord> {
        self.read()
            .conflicts
            .values()
            .filter(|c| matches!(c.status, crate::patch::ConflictStatus::Open))
            .cloned()
            .collect()
    }

    pub fn all_conflicts(&self) -> Vec<ConflictRecord> {
        self.read().conflicts.values().cloned().collect()
    }

    // -- quality gates ------------------------------------------------------

    pub fn set_quality_gate(&self, state: QualityGateState) {
        self.write().quality_gates.insert(state.gate.clone(), state);
    }

    pub fn quality_gate(&self, gate: &str) -> Option<QualityGateState> {
        self.read().quality_gates.get(gate).cloned()
    }
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::AgentId;

    #[test]
    fn workspace_snapshot_reflects_latest_per_path() {
        let board = Blackboard::new();
        board.put_intents(vec![PatchIntent::new(
            "i1",
            1,
            "t1",
            AgentId::Scaffold,
            "src/App.tsx",
            "v1",
            10,
        )]);
        board.put_intents(vec![PatchIntent::new(
            "i2",
            2,
            "t2",
            AgentId::Page,
            "src/App.tsx",
            "v2",
            20,
        )]);
        let snapshot = board.workspace_snapshot();
        assert_eq!(snapshot.get("src/App.tsx").map(String::as_str), Some("v2"));
    }

    #[test]
    fn failed_tasks_accumulate() {
        let board = Blackboard::new();
        board.record_task_failed("t1".to_string());
        board.record_task_failed("t2".to_string());
        assert_eq!(board.failed_tasks(), vec!["t1", "t2"]);
    }
}
