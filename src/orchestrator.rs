//! The Orchestrator (C9) — drives Scheduler → Task Runner (per wave) →
//! Patch Merger → Quality/Repair Loop to completion and folds the result
//! into the spec.md §6 output shape.
//!
//! Grounded on the teacher's `ensemble/coordinator.rs` `EnsembleCoordinator`
//! (a top-level struct owning the LLM/tool/store collaborators, one `run`-
//! shaped entry point, internal event emission at every state transition)
//! and `harness/session.rs`'s `SessionSummary` (a plain `Display` render of
//! a run's outcome) for `RunSummary`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::blackboard::{Blackboard, GateStatus, SharedBlackboard};
use crate::budget::{create_budget_state, ExecutionBudgetState, RuntimeBudgetInput, StopReason};
use crate::config::ExecutionAgentConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::events::{EventBus, EventHistory, EventLevel, RuntimeEvent, RuntimeEventKind, SharedEventBus, SharedEventHistory};
use crate::llm::{FileStorage, LlmAdapter, PromptBuilder, ToolExecutor};
use crate::patch::{PatchIntent, PatchMerger};
use crate::plan::{ExecutionPlan, TaskId};
use crate::quality;
use crate::runner::{RunnerError, TaskRunner};
use crate::score::{apply_target_score, compute_score, ScoreInput};
use crate::session::{ExecutionContext, SessionDocument};

/// Cooperative cancellation signal (spec.md §5's `abortSignal`). Checked
/// between tasks and between waves; never polled inside a lock.
pub type AbortSignal = Arc<AtomicBool>;

/// `{sessionId, runId, userMessage, platform?, techStack?[], plan, runtimeBudget?}`
/// (spec.md §6's Orchestrator input). `abortSignal`/`emitRuntimeEvent` from
/// the spec's input shape are represented structurally: the abort signal is
/// an explicit field, and the orchestrator's own `EventBus` plays the role
/// of `emitRuntimeEvent` — callers subscribe to it instead of supplying a
/// callback.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub session_id: String,
    pub run_id: String,
    pub user_message: String,
    pub platform: Option<String>,
    pub tech_stack: Vec<String>,
    pub session_documents: Vec<SessionDocument>,
    pub plan: ExecutionPlan,
    pub runtime_budget: Option<RuntimeBudgetInput>,
    pub abort_signal: Option<AbortSignal>,
}

/// `budgetUsage` payload (spec.md §6).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUsage {
    pub used_iterations: u64,
    pub used_tool_calls: u64,
    pub elapsed_ms: u64,
    pub final_score: Option<u32>,
}

/// Orchestrator output (spec.md §6). `success` is true iff `degradedTasks`
/// and `unresolvedIssues` are both empty, the quality gate passed, and no
/// budget stop reason fired.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    pub success: bool,
    pub patch_intents: Vec<PatchIntent>,
    pub touched_files: Vec<String>,
    pub degraded_tasks: Vec<TaskId>,
    pub unresolved_issues: Vec<String>,
    pub budget_usage: Option<BudgetUsage>,
    pub budget_stop_reason: Option<StopReason>,
    pub final_score: i64,
}

/// A plain-text render of a `RunOutput`, for CLI/log consumption
/// (SPEC_FULL.md §B.1), grounded on the teacher's `SessionSummary` Display
/// impl.
pub struct RunSummary<'a>(pub &'a RunOutput);

impl std::fmt::Display for RunSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let out = self.0;
        writeln!(f, "Run {}", if out.success { "succeeded" } else { "degraded" })?;
        writeln!(f, "Final score: {}", out.final_score)?;
        writeln!(f, "Touched files: {}", out.touched_files.len())?;
        if !out.degraded_tasks.is_empty() {
            writeln!(f, "Degraded tasks: {}", out.degraded_tasks.join(", "))?;
        }
        if !out.unresolved_issues.is_empty() {
            writeln!(f, "Unresolved issues:")?;
            for issue in &out.unresolved_issues {
                writeln!(f, "  - {issue}")?;
            }
        }
        if let Some(reason) = out.budget_stop_reason {
            writeln!(f, "Budget stop reason: {reason}")?;
        }
        if let Some(usage) = &out.budget_usage {
            writeln!(
                f,
                "Budget usage: {} iteration(s), {} tool call(s), {}ms elapsed",
                usage.used_iterations, usage.used_tool_calls, usage.elapsed_ms
            )?;
        }
        Ok(())
    }
}

/// Owns the external collaborators (spec.md §6) and drives one run to
/// completion.
pub struct Orchestrator {
    runner: TaskRunner,
    prompt_builder: Arc<dyn PromptBuilder>,
    event_bus: SharedEventBus,
    event_history: SharedEventHistory,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmAdapter>,
        tool_executor: Arc<dyn ToolExecutor>,
        file_storage: Arc<dyn FileStorage>,
        prompt_builder: Arc<dyn PromptBuilder>,
        config: ExecutionAgentConfig,
    ) -> Self {
        let event_bus = EventBus::new().shared();
        let event_history = EventHistory::new().shared();
        let events = crate::runner::EventSink::new(event_bus.clone(), event_history.clone());
        Self {
            runner: TaskRunner::with_events(llm, tool_executor, file_storage, config.default_timeout_ms, events),
            prompt_builder,
            event_bus,
            event_history,
        }
    }

    pub fn event_bus(&self) -> &SharedEventBus {
        &self.event_bus
    }

    pub fn event_history(&self) -> &SharedEventHistory {
        &self.event_history
    }

    fn emit(&self, level: EventLevel, kind: RuntimeEventKind) -> RuntimeEvent {
        self.emit_grouped(level, kind, None)
    }

    fn emit_grouped(&self, level: EventLevel, kind: RuntimeEventKind, group_id: Option<String>) -> RuntimeEvent {
        let event = self.event_bus.emit_grouped(level, kind, group_id, None);
        self.event_history.record(event.clone());
        event
    }

    /// Emits the `autonomy.budget` event for a `BudgetEvent` payload
    /// (spec.md §4.4/§4.7): `progress` level normally, `error` level for
    /// the terminal exhaustion event.
    fn emit_budget_event(&self, wave_id: u32, event: crate::budget::BudgetEvent) {
        let level = if event.terminal { EventLevel::Error } else { EventLevel::Progress };
        self.emit_grouped(
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
        );
    }

    fn aborted(signal: &Option<AbortSignal>) -> bool {
        signal.as_ref().is_some_and(|s| s.load(Ordering::SeqCst))
    }

    /// Drive one run to completion (spec.md §4's top-level pipeline:
    /// Scheduler → Task Runner per wave → Patch Merger → Quality/Repair
    /// Loop → score).
    pub async fn run(&self, input: RunInput) -> OrchestratorResult<RunOutput> {
        let blackboard: SharedBlackboard = Blackboard::shared();
        blackboard.set_plan(input.plan.clone());
        blackboard.set_session_documents(input.session_documents.clone());

        let waves = crate::scheduler::schedule(&input.plan)?;

        let ctx = ExecutionContext {
            session_id: input.session_id.clone(),
            run_id: input.run_id.clone(),
            user_message: input.user_message.clone(),
            platform: input.platform.clone(),
            tech_stack: input.tech_stack.clone(),
            session_documents: input.session_documents.clone(),
            plan: input.plan.clone(),
        };

        let budget_state = input.runtime_budget.clone().and_then(create_budget_state);
        let budget: Option<Mutex<ExecutionBudgetState>> = budget_state.map(Mutex::new);

        let mut skipped_tasks: Vec<TaskId> = Vec::new();
        let mut stopped = false;

        'waves: for (wave_idx, wave) in waves.iter().enumerate() {
            let wave_id = wave_idx as u32;
            self.emit(
                EventLevel::Progress,
                RuntimeEventKind::AutonomyIteration { iteration: wave_id, wave_id },
            );

            if let Some(budget) = &budget {
                let (result, event) = {
                    let mut guard = budget.lock().expect("budget lock poisoned");
                    let result = guard.assert_duration("wave-start");
                    (result, guard.take_last_event())
                };
                if let Some(event) = event {
                    self.emit_budget_event(wave_id, event);
                }
                if let Err(msg) = result {
                    self.emit(EventLevel::Error, RuntimeEventKind::AutonomyDecision {
                        decision: "stop".to_string(),
                        reason: msg,
                    });
                    stopped = true;
                }
            }
            if stopped || Self::aborted(&input.abort_signal) {
                for task_id in wave {
                    skipped_tasks.push(task_id.clone());
                }
                break 'waves;
            }

            let mut wave_intents: Vec<PatchIntent> = Vec::new();

            for task_id in wave {
                if stopped || Self::aborted(&input.abort_signal) {
                    skipped_tasks.push(task_id.clone());
                    continue;
                }
                let Some(task) = input.plan.get(task_id) else {
                    return Err(OrchestratorError::UnknownAgent(task_id.clone()));
                };

                blackboard.record_task_started(task_id.clone());
                self.emit_grouped(
                    EventLevel::Info,
                    RuntimeEventKind::AgentTaskProgress {
                        task_id: task_id.clone(),
                        agent_id: task.agent_id.to_string(),
                        attempt: 1,
                        message: "started".to_string(),
                    },
                    Some(wave_id.to_string()),
                );

                let result = self
                    .runner
                    .execute(task, &ctx, wave_id, self.prompt_builder.as_ref(), budget.as_ref(), &blackboard)
                    .await;

                match result {
                    Ok(task_result) if task_result.success => {
                        for intent in &task_result.patch_intents {
                            self.emit_grouped(
                                EventLevel::Success,
                                RuntimeEventKind::PatchIntentSubmitted {
                                    wave_id,
                                    task_id: task_id.clone(),
                                    file_path: intent.file_path.clone(),
                                    content_hash: intent.content_hash.clone(),
                                },
                                Some(wave_id.to_string()),
                            );
                        }
                        wave_intents.extend(task_result.patch_intents);
                    }
                    Ok(task_result) => {
                        skipped_tasks.push(task_id.clone());
                        self.emit_grouped(
                            EventLevel::Error,
                            RuntimeEventKind::AgentTaskProgress {
                                task_id: task_id.clone(),
                                agent_id: task.agent_id.to_string(),
                                attempt: 1,
                                message: task_result.error.unwrap_or_default(),
                            },
                            Some(wave_id.to_string()),
                        );
                    }
                    Err(RunnerError::Budget(_)) => {
                        skipped_tasks.push(task_id.clone());
                        stopped = true;
                    }
                }
            }

            let merged = PatchMerger::merge(format!("wave-{wave_id}"), wave_id, wave_intents);
            blackboard.put_conflicts(merged.conflicts.clone());
            self.emit_grouped(
                EventLevel::Info,
                RuntimeEventKind::PatchBatchMerged {
                    wave_id,
                    touched_files: merged.touched_files.clone(),
                    conflicts: merged.conflicts.len(),
                },
                Some(wave_id.to_string()),
            );
            for conflict in &merged.conflicts {
                self.emit_grouped(
                    EventLevel::Info,
                    RuntimeEventKind::ConflictDetected {
                        wave_id,
                        file_path: conflict.file_path.clone(),
                        candidate_task_ids: conflict.involved_agents.iter().map(|a| a.to_string()).collect(),
                    },
                    Some(wave_id.to_string()),
                );
                if let Some(winner) = merged.merged.iter().find(|i| i.file_path == conflict.file_path) {
                    self.emit_grouped(
                        EventLevel::Info,
                        RuntimeEventKind::ConflictResolved {
                            wave_id,
                            file_path: conflict.file_path.clone(),
                            winner_task_id: winner.task_id.clone(),
                        },
                        Some(wave_id.to_string()),
                    );
                }
            }

            if stopped {
                break 'waves;
            }
        }

        for task_id in &skipped_tasks {
            blackboard.record_task_failed(task_id.clone());
        }

        let max_rounds = match &budget {
            Some(budget) => {
                let (rounds, event) = {
                    let mut guard = budget.lock().expect("budget lock poisoned");
                    let rounds = guard.resolve_quality_max_rounds();
                    (rounds, guard.take_last_event())
                };
                if let Some(event) = event {
                    self.emit_budget_event(waves.len() as u32, event);
                }
                rounds
            }
            None => 5,
        };

        let quality_outcome = if stopped {
            let gate = crate::blackboard::QualityGateState::failed(
                quality::ARTIFACT_QUALITY_GATE.to_string(),
                "Degraded completion — budget exhausted before the quality loop could run.",
            );
            blackboard.set_quality_gate(gate.clone());
            quality::QualityOutcome {
                gate,
                unresolved_issues: Vec::new(),
                rounds_used: 0,
            }
        } else {
            quality::run(&self.runner, &ctx, waves.len() as u32, max_rounds, self.prompt_builder.as_ref(), budget.as_ref(), &blackboard)
                .await?
        };
        self.emit(
            EventLevel::Info,
            RuntimeEventKind::QualityGateUpdated {
                gate: quality_outcome.gate.gate.clone(),
                status: format!("{:?}", quality_outcome.gate.status),
                summary: quality_outcome.gate.summary.clone(),
            },
        );

        let mut degraded_tasks = blackboard.failed_tasks();
        degraded_tasks.sort();
        degraded_tasks.dedup();

        let gate_status = quality_outcome.gate.status;
        let mut unresolved_issues = quality_outcome.unresolved_issues;

        let score = compute_score(ScoreInput {
            gate_status,
            degraded_tasks: degraded_tasks.len(),
            unresolved_issues: &unresolved_issues,
        });

        let target_score = input.runtime_budget.as_ref().and_then(|b| b.target_score);
        let (issues, target_met) = apply_target_score(score, target_score, unresolved_issues);
        unresolved_issues = issues;
        if !target_met {
            if let Some(budget) = &budget {
                let event = {
                    let mut guard = budget.lock().expect("budget lock poisoned");
                    guard.check_target_score(score as u32);
                    guard.take_last_event()
                };
                if let Some(event) = event {
                    self.emit_budget_event(waves.len() as u32, event);
                }
            }
        }

        let budget_stop_reason = budget
            .as_ref()
            .and_then(|b| b.lock().expect("budget lock poisoned").stop_reason());

        if let Some(budget) = &budget {
            budget.lock().expect("budget lock poisoned").set_final_score(score.max(0) as u32);
        }

        let budget_usage = budget.as_ref().map(|b| {
            let guard = b.lock().expect("budget lock poisoned");
            BudgetUsage {
                used_iterations: guard.used_iterations(),
                used_tool_calls: guard.used_tool_calls(),
                elapsed_ms: guard.elapsed().as_millis() as u64,
                final_score: guard.final_score(),
            }
        });

        // Re-merge the run's full intent history to get the final
        // winner-per-path set (spec.md §8 invariant 3: merge is idempotent,
        // so re-merging everything ever submitted yields the same result
        // as merging each wave and keeping the last winner per file).
        let final_batch = PatchMerger::merge("final", 0, blackboard.all_intents());
        let patch_intents = final_batch.merged;
        let touched_files = final_batch.touched_files;

        let success =
            degraded_tasks.is_empty() && unresolved_issues.is_empty() && matches!(gate_status, GateStatus::Passed) && budget_stop_reason.is_none();

        let output = RunOutput {
            success,
            patch_intents,
            touched_files,
            degraded_tasks,
            unresolved_issues,
            budget_usage,
            budget_stop_reason,
            final_score: score,
        };

        self.emit(
            EventLevel::Info,
            if output.success {
                RuntimeEventKind::RunCompleted { success: true, final_score: output.final_score }
            } else {
                RuntimeEventKind::RunError {
                    message: format!("run degraded: {} unresolved issue(s)", output.unresolved_issues.len()),
                }
            },
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_summary_renders_degraded_tasks_and_issues() {
        let output = RunOutput {
            success: false,
            patch_intents: Vec::new(),
            touched_files: vec!["src/App.tsx".to_string()],
            degraded_tasks: vec!["t1".to_string()],
            unresolved_issues: vec!["src/App.tsx is empty".to_string()],
            budget_usage: None,
            budget_stop_reason: Some(StopReason::MaxIterations),
            final_score: 45,
        };
        let rendered = RunSummary(&output).to_string();
        assert!(rendered.contains("degraded"));
        assert!(rendered.contains("Final score: 45"));
        assert!(rendered.contains("t1"));
        assert!(rendered.contains("src/App.tsx is empty"));
        assert!(rendered.contains("maxIterations"));
    }

    #[test]
    fn run_summary_clean_run_has_no_issue_section() {
        let output = RunOutput {
            success: true,
            patch_intents: Vec::new(),
            touched_files: Vec::new(),
            degraded_tasks: Vec::new(),
            unresolved_issues: Vec::new(),
            budget_usage: None,
            budget_stop_reason: None,
            final_score: 100,
        };
        let rendered = RunSummary(&output).to_string();
        assert!(rendered.contains("succeeded"));
        assert!(!rendered.contains("Unresolved issues"));
    }
}
