//! Shared fakes for cross-module integration tests (SPEC_FULL.md §A.4).
//!
//! This crate ships no concrete `LlmAdapter`/`ToolExecutor` (spec.md §1's
//! Non-goals); these fakes stand in for a host's real adapter so the
//! Task Runner's state machine, the Patch Merger, and the Quality/Repair
//! Loop can be exercised end to end without a live model. An adapter
//! "calls a tool" by writing straight into the shared in-memory workspace
//! and honoring the supplied `BudgetGate`, mirroring what a real adapter
//! would do via its own tool-execution loop (`llm.rs`'s `ToolExecutor` is
//! stored on `TaskRunner` for host wiring but never invoked by the runner
//! itself — the adapter owns the tool loop).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use exec_orchestration_core::{
    BudgetGate, CompletionRequest, CompletionResult, ExecutionContext, FileStorage, FinishReason,
    LlmAdapter, PromptBuilder, ToolExecutor, ToolResult, Usage, WorkspaceSnapshot,
};

pub type SharedWorkspace = Arc<Mutex<HashMap<String, String>>>;

pub fn shared_workspace(seed: impl IntoIterator<Item = (&'static str, &'static str)>) -> SharedWorkspace {
    let map = seed
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(Mutex::new(map))
}

/// `FileStorage` backed directly by a `SharedWorkspace`.
pub struct FakeFileStorage(pub SharedWorkspace);

#[async_trait]
impl FileStorage for FakeFileStorage {
    async fn get_all_files(&self, _session_id: &str) -> WorkspaceSnapshot {
        self.0.lock().unwrap().clone()
    }
}

/// Never invoked by `TaskRunner` directly (see module doc); supplied only
/// because `TaskRunner::new` requires one.
pub struct UnusedToolExecutor;

#[async_trait]
impl ToolExecutor for UnusedToolExecutor {
    async fn execute(&self, name: &str, _args: serde_json::Value) -> ToolResult {
        ToolResult {
            content: format!("unexpected direct call to tool '{name}'"),
            is_error: true,
        }
    }
}

pub struct StubPromptBuilder;

impl PromptBuilder for StubPromptBuilder {
    fn build_prompt(&self, ctx: &ExecutionContext) -> String {
        format!("{}: {}", ctx.run_id, ctx.user_message)
    }
}

/// One scripted LLM turn: the files it writes into the shared workspace
/// (simulating a successful tool dispatch), the text it returns, and an
/// optional simulated latency (for wall-clock budget tests).
#[derive(Clone, Default)]
pub struct ScriptedTurn {
    pub writes: Vec<(&'static str, &'static str)>,
    pub text: &'static str,
    pub delay_ms: u64,
}

impl ScriptedTurn {
    pub fn writing(writes: &[(&'static str, &'static str)], text: &'static str) -> Self {
        Self {
            writes: writes.to_vec(),
            text,
            delay_ms: 0,
        }
    }

    pub fn text_only(text: &'static str) -> Self {
        Self {
            writes: Vec::new(),
            text,
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Consumes one `ScriptedTurn` per `complete()` call, in order, writing
/// straight into the shared workspace and honoring the `BudgetGate` for
/// every write (as a real adapter would before each tool dispatch). Panics
/// if called more times than scripted, so a test's call count doubles as
/// an assertion on how many attempts the runner made.
pub struct ScriptedLlmAdapter {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    workspace: SharedWorkspace,
}

impl ScriptedLlmAdapter {
    pub fn new(workspace: SharedWorkspace, turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            workspace,
        }
    }
}

#[async_trait]
impl LlmAdapter for ScriptedLlmAdapter {
    async fn complete(
        &self,
        _request: CompletionRequest,
        budget_gate: &dyn BudgetGate,
    ) -> Result<CompletionResult, String> {
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedLlmAdapter called more times than scripted");

        if turn.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(turn.delay_ms)).await;
        }

        for (path, content) in &turn.writes {
            budget_gate.before_tool_call("write_file").await?;
            self.workspace
                .lock()
                .unwrap()
                .insert(path.to_string(), content.to_string());
        }

        Ok(CompletionResult {
            text: turn.text.to_string(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        })
    }
}
