//! Task Runner (C5) — single-task attempt state machine (spec.md §4.2).
//!
//! Grounded on `crates/swarm-agents/src/state_machine.rs` for the attempt
//! state graph (see `state_machine` submodule) and `feedback/error_parser.rs`
//! for the retry-classification idiom (see `policy` submodule). The
//! orchestration logic itself (`TaskRunner::execute`) is new: the teacher has
//! no equivalent bounded-retry-with-whitelist-narrowing loop.

pub mod policy;
pub mod state_machine;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::blackboard::Blackboard;
use crate::budget::{BudgetError, BudgetEvent, ExecutionBudgetState};
use crate::events::{EventLevel, RuntimeEventKind, SharedEventBus, SharedEventHistory};
use crate::llm::{BudgetGate, CompletionRequest, FileStorage, LlmAdapter, PromptBuilder, ToolExecutor};
use crate::patch::PatchIntent;
use crate::plan::{AgentId, ExecutionPlanTask};
use crate::session::ExecutionContext;
use crate::tools::{diff_snapshots, ToolBridge};

use self::state_machine::{AttemptState, AttemptStateMachine};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("budget exceeded: {0}")]
    Budget(#[from] BudgetError),
}

/// `TaskResult{taskId, agentId, success, patchIntents, touchedFiles,
/// responseText?, error?}` (spec.md §4.2).
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task_id: String,
    pub agent_id: AgentId,
    pub success: bool,
    pub patch_intents: Vec<PatchIntent>,
    pub touched_files: Vec<String>,
    pub response_text: Option<String>,
    pub error: Option<String>,
}

impl TaskResult {
    fn failure(task: &ExecutionPlanTask, error: impl Into<String>) -> Self {
        Self {
            task_id: task.id.clone(),
            agent_id: task.agent_id,
            success: false,
            patch_intents: Vec::new(),
            touched_files: Vec::new(),
            response_text: None,
            error: Some(error.into()),
        }
    }
}

/// Where `autonomy.budget` events go, if the host wants them (spec.md
/// §4.4/§4.7). `None` in tests that don't care about the event stream.
#[derive(Clone, Default)]
pub struct EventSink {
    pub bus: Option<SharedEventBus>,
    pub history: Option<SharedEventHistory>,
}

impl EventSink {
    pub fn new(bus: SharedEventBus, history: SharedEventHistory) -> Self {
        Self { bus: Some(bus), history: Some(history) }
    }

    /// Builds and emits the `autonomy.budget` event for a `BudgetEvent`
    /// payload: `progress` level normally, `error` level for the terminal
    /// exhaustion event.
    fn emit_budget_event(&self, wave_id: u32, event: BudgetEvent) {
        let Some(bus) = &self.bus else {
            return;
        };
        let level = if event.terminal { EventLevel::Error } else { EventLevel::Progress };
        let emitted = bus.emit_grouped(
            level,
            RuntimeEventKind::AutonomyBudget {
                unit: event.unit,
                used: event.used,
                limit: event.limit,
                remaining: event.remaining,
                status: event.status,
                terminal: event.terminal,
            },
            Some(wave_id.to_string()),
            None,
        );
        if let Some(history) = &self.history {
            history.record(emitted);
        }
    }
}

struct RunnerBudgetGate<'a> {
    budget: Option<&'a Mutex<ExecutionBudgetState>>,
    events: &'a EventSink,
    wave_id: u32,
}

#[async_trait::async_trait]
impl<'a> BudgetGate for RunnerBudgetGate<'a> {
    async fn before_tool_call(&self, tool_name: &str) -> Result<(), String> {
        let Some(budget) = self.budget else {
            return Ok(());
        };
        let (result, event) = {
            let mut guard = budget.lock().expect("budget lock poisoned");
            let result = guard.reserve_tool_call(tool_name);
            (result, guard.take_last_event())
        };
        if let Some(event) = event {
            self.events.emit_budget_event(self.wave_id, event);
        }
        result.map(|_| ()).map_err(|msg| format!("RUNTIME_BUDGET_EXCEEDED: {msg}"))
    }
}

/// Drives one task's bounded-attempt state machine (spec.md §4.2).
pub struct TaskRunner {
    llm: std::sync::Arc<dyn LlmAdapter>,
    tool_executor: std::sync::Arc<dyn ToolExecutor>,
    file_storage: std::sync::Arc<dyn FileStorage>,
    tool_bridge: ToolBridge,
    default_timeout_ms: u64,
    /// Run-wide monotonic counter for `PatchIntent::created_at` (spec.md §3
    /// says this is "not wall-clock time... an incrementing counter"). Must
    /// be shared across every task the runner executes, not reset per task,
    /// so the Patch Merger's `(createdAt, contentHash)` tie-break reflects
    /// true submission order across a wave (spec.md §4.3/§8 Scenario 2).
    intent_seq: AtomicI64,
    events: EventSink,
}

impl TaskRunner {
    pub fn new(
        llm: std::sync::Arc<dyn LlmAdapter>,
        tool_executor: std::sync::Arc<dyn ToolExecutor>,
        file_storage: std::sync::Arc<dyn FileStorage>,
        default_timeout_ms: u64,
    ) -> Self {
        Self::with_events(llm, tool_executor, file_storage, default_timeout_ms, EventSink::default())
    }

    pub fn with_events(
        llm: std::sync::Arc<dyn LlmAdapter>,
        tool_executor: std::sync::Arc<dyn ToolExecutor>,
        file_storage: std::sync::Arc<dyn FileStorage>,
        default_timeout_ms: u64,
        events: EventSink,
    ) -> Self {
        Self {
            llm,
            tool_executor,
            file_storage,
            tool_bridge: ToolBridge::new(),
            default_timeout_ms,
            intent_seq: AtomicI64::new(0),
            events,
        }
    }

    /// `execute(task, context, waveIndex) -> TaskResult` (spec.md §4.2).
    pub async fn execute(
        &self,
        task: &ExecutionPlanTask,
        ctx: &ExecutionContext,
        wave_id: u32,
        prompt_builder: &dyn PromptBuilder,
        budget: Option<&Mutex<ExecutionBudgetState>>,
        blackboard: &Blackboard,
    ) -> Result<TaskResult, RunnerError> {
        let agent_id = task.agent_id;
        let max_attempts = agent_id.max_attempts();
        let mut sm = AttemptStateMachine::new();
        let mut last_error: Option<String> = None;

        loop {
            let attempt = sm.attempt();

            // 1. Pre-flight.
            sm.advance(AttemptState::PromptAssembly).ok();
            if let Some(budget) = budget {
                let (consume_result, event) = {
                    let mut guard = budget.lock().expect("budget lock poisoned");
                    let result = guard.consume_iteration(&task.id, wave_id);
                    (result, guard.take_last_event())
                };
                if let Some(event) = event {
                    self.events.emit_budget_event(wave_id, event);
                }
                consume_result?;

                let (duration_result, event) = {
                    let mut guard = budget.lock().expect("budget lock poisoned");
                    let result = guard.assert_duration("pre-flight");
                    (result, guard.take_last_event())
                };
                if let Some(event) = event {
                    self.events.emit_budget_event(wave_id, event);
                }
                if let Err(msg) = duration_result {
                    return Ok(TaskResult::failure(task, msg));
                }
            }

            // 2. Prompt assembly.
            let system_prompt = prompt_builder.build_prompt(ctx);
            let mut user_message = ctx.user_message.clone();
            if let Some(hint) = last_error.as_deref() {
                user_message.push_str("\n\nRETRY HINT: ");
                user_message.push_str(hint);
            }
            sm.advance(AttemptState::ToolWhitelistSelection).ok();

            // 3. Tool whitelist selection.
            let whitelist = self
                .tool_bridge
                .select_whitelist(agent_id, &task.tools, attempt);
            let tool_defs = self.tool_bridge.resolve(&whitelist);
            sm.advance(AttemptState::TimeoutDerivation).ok();

            // 4. Timeout derivation.
            let remaining_duration_budget = budget.and_then(|b| {
                let guard = b.lock().expect("budget lock poisoned");
                guard.remaining_duration()
            });
            let attempt_timeout = policy::derive_attempt_timeout(
                agent_id,
                attempt,
                self.default_timeout_ms,
                remaining_duration_budget,
            );
            let wrapped_timeout = policy::hard_timeout(attempt_timeout);
            sm.advance(AttemptState::FilesystemSnapshot).ok();

            // 5. Filesystem snapshot.
            let before = self.file_storage.get_all_files(&ctx.session_id).await;
            sm.advance(AttemptState::LlmToolLoop).ok();

            // 6. LLM+tool loop.
            let gate = RunnerBudgetGate {
                budget,
                events: &self.events,
                wave_id,
            };
            let request = CompletionRequest {
                system_prompt,
                user_message,
                tools: tool_defs,
            };
            let completion = tokio::time::timeout(wrapped_timeout, self.llm.complete(request, &gate)).await;

            let completion = match completion {
                Ok(Ok(result)) => result,
                Ok(Err(msg)) => {
                    if policy::is_transient_transport_error(&msg) && attempt < max_attempts {
                        last_error = Some(format!("transient transport error: {msg}; please retry"));
                        sm.advance(AttemptState::DiffCollection).ok();
                        sm.advance(AttemptState::PolicyChecks).ok();
                        sm.advance(AttemptState::PreFlight).ok();
                        continue;
                    }
                    let result = TaskResult::failure(task, msg);
                    blackboard.record_task_failed(task.id.clone());
                    return Ok(result);
                }
                Err(_) => {
                    if attempt < max_attempts {
                        last_error = Some("attempt timed out; please be more concise".to_string());
                        sm.advance(AttemptState::DiffCollection).ok();
                        sm.advance(AttemptState::PolicyChecks).ok();
                        sm.advance(AttemptState::PreFlight).ok();
                        continue;
                    }
                    let result = TaskResult::failure(task, "attempt timed out");
                    blackboard.record_task_failed(task.id.clone());
                    return Ok(result);
                }
            };
            sm.advance(AttemptState::DiffCollection).ok();

            // 7. Diff collection.
            let after = self.file_storage.get_all_files(&ctx.session_id).await;
            let touched = diff_snapshots(&before, &after);
            let intents: Vec<PatchIntent> = touched
                .iter()
                .map(|path| {
                    let seq = self.intent_seq.fetch_add(1, Ordering::SeqCst) + 1;
                    PatchIntent::new(
                        format!("{}-{}-{}", task.id, wave_id, seq),
                        wave_id,
                        task.id.clone(),
                        agent_id,
                        path.clone(),
                        after.get(path).cloned().unwrap_or_default(),
                        seq,
                    )
                })
                .collect();
            sm.advance(AttemptState::PolicyChecks).ok();

            // 8. Policy checks.
            if agent_id.is_mutation_required() && intents.is_empty() {
                if attempt < max_attempts {
                    last_error = Some(
                        "you produced no file changes; you must write or modify at least one file"
                            .to_string(),
                    );
                    sm.advance(AttemptState::PreFlight).ok();
                    continue;
                }
                let result = TaskResult::failure(task, "mutation-required agent produced no patch intents");
                blackboard.record_task_failed(task.id.clone());
                return Ok(result);
            }

            if agent_id == AgentId::Repair {
                let unresolved = crate::analyzer::unresolved_imports(&after);
                if !unresolved.is_empty() {
                    if attempt < max_attempts {
                        last_error = Some(format!(
                            "unresolved imports remain: {}",
                            unresolved.join(", ")
                        ));
                        sm.advance(AttemptState::PreFlight).ok();
                        continue;
                    }
                    let result = TaskResult::failure(
                        task,
                        format!("unresolved imports remain: {}", unresolved.join(", ")),
                    );
                    blackboard.record_task_failed(task.id.clone());
                    return Ok(result);
                }
            }

            // 9. Publish.
            blackboard.put_intents(intents.clone());
            sm.advance(AttemptState::Published).ok();
            tracing::info!(
                task_id = %task.id,
                agent_id = %agent_id,
                files_changed = intents.len(),
                "completed - {} file(s) changed",
                intents.len()
            );

            return Ok(TaskResult {
                task_id: task.id.clone(),
                agent_id,
                success: true,
                patch_intents: intents,
                touched_files: touched,
                response_text: Some(completion.text),
                error: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_result_failure_has_no_intents() {
        let task = ExecutionPlanTask::new("t1", AgentId::Page, "goal");
        let result = TaskResult::failure(&task, "boom");
        assert!(!result.success);
        assert!(result.patch_intents.is_empty());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }
}
