//! Budget Tracker (C3) — iteration/duration/tool-call/target-score
//! accounting and stop-reason semantics (spec.md §4.4).
//!
//! Grounded on the teacher's `escalation/state.rs` (budget struct shape,
//! `remaining_budget`/`status`-style accessors) and `memory/budget.rs`
//! (`BudgetDecision`'s ok/warning/exhausted tiers), adapted from "tier
//! budgets across a multi-tier swarm" to "the four limits in a single run's
//! `ExecutionBudgetState`".

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::TaskId;

/// Which budget limit, if any, first stopped the run. First-writer-wins:
/// once set it never changes (spec.md §8 invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    MaxIterations,
    MaxDurationMs,
    MaxToolCalls,
    TargetScore,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::MaxIterations => "maxIterations",
            StopReason::MaxDurationMs => "maxDurationMs",
            StopReason::MaxToolCalls => "maxToolCalls",
            StopReason::TargetScore => "targetScore",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BudgetError {
    #[error("budget exceeded: {0}")]
    Exceeded(StopReason),
}

/// Ok/warning/exhausted classification of a used/limit pair, mirroring the
/// teacher's `BudgetDecision` tiers but collapsed to the three states
/// spec.md §4.4's `status()` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Ok,
    Warning,
    Exhausted,
}

/// `status(used, limit)`: exhausted when remaining <= 0, warning when
/// remaining/limit <= 0.2, else ok (spec.md §4.4).
pub fn status(used: u64, limit: u64) -> BudgetStatus {
    if limit == 0 {
        return BudgetStatus::Exhausted;
    }
    let remaining = limit.saturating_sub(used);
    if remaining == 0 {
        BudgetStatus::Exhausted
    } else if (remaining as f64) / (limit as f64) <= 0.2 {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Ok
    }
}

/// Caller-supplied limits; any subset may be set (spec.md §3). A limit of
/// `None` means unbounded for that dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeBudgetInput {
    pub max_iterations: Option<u64>,
    pub max_duration_ms: Option<u64>,
    pub max_tool_calls: Option<u64>,
    pub target_score: Option<u32>,
}

impl RuntimeBudgetInput {
    fn has_any_limit(&self) -> bool {
        self.max_iterations.is_some_and(|v| v > 0)
            || self.max_duration_ms.is_some_and(|v| v > 0)
            || self.max_tool_calls.is_some_and(|v| v > 0)
            || self.target_score.is_some_and(|v| v > 0)
    }
}

/// An `autonomy.budget` event payload, emitted on every consume/reserve
/// call and on a terminal stop (spec.md §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetEvent {
    pub unit: &'static str,
    pub used: u64,
    pub limit: u64,
    pub remaining: i64,
    pub status: BudgetStatus,
    pub terminal: bool,
}

/// Live budget accounting for a single run (spec.md §3's
/// `ExecutionBudgetState`).
#[derive(Debug)]
pub struct ExecutionBudgetState {
    limits: RuntimeBudgetInput,
    used_iterations: u64,
    used_tool_calls: u64,
    started_at: Instant,
    stop_reason: Option<StopReason>,
    stop_message: Option<String>,
    final_score: Option<u32>,
    /// The `autonomy.budget` payload produced by the most recent mutating
    /// call (spec.md §4.4/§4.7). Callers with `EventBus` access drain this
    /// with `take_last_event` right after each call and emit it themselves —
    /// the Budget Tracker has no event-system dependency of its own.
    last_event: Option<BudgetEvent>,
}

/// `createBudgetState(input)`: returns a tracker only if at least one limit
/// is finite and positive; otherwise the run is unbounded (spec.md §4.4).
pub fn create_budget_state(input: RuntimeBudgetInput) -> Option<ExecutionBudgetState> {
    if !input.has_any_limit() {
        return None;
    }
    Some(ExecutionBudgetState {
        limits: input,
        used_iterations: 0,
        used_tool_calls: 0,
        started_at: Instant::now(),
        stop_reason: None,
        stop_message: None,
        final_score: None,
        last_event: None,
    })
}

impl ExecutionBudgetState {
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Remaining wall-clock budget, if a duration limit is set. Used by the
    /// Task Runner to clip per-attempt timeouts (spec.md §4.2 step 4).
    pub fn remaining_duration(&self) -> Option<Duration> {
        self.limits.max_duration_ms.map(|limit_ms| {
            let elapsed_ms = self.elapsed().as_millis() as u64;
            Duration::from_millis(limit_ms.saturating_sub(elapsed_ms))
        })
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn stop_message(&self) -> Option<&str> {
        self.stop_message.as_deref()
    }

    pub fn used_iterations(&self) -> u64 {
        self.used_iterations
    }

    pub fn used_tool_calls(&self) -> u64 {
        self.used_tool_calls
    }

    pub fn final_score(&self) -> Option<u32> {
        self.final_score
    }

    pub fn set_final_score(&mut self, score: u32) {
        self.final_score = Some(score);
    }

    /// Drains the `autonomy.budget` event payload produced by the most
    /// recent `consume_iteration`/`reserve_tool_call`/`assert_duration`/
    /// `mark_stop` call, if any (spec.md §4.4/§4.7).
    pub fn take_last_event(&mut self) -> Option<BudgetEvent> {
        self.last_event.take()
    }

    /// `consumeIteration(task, waveId)` (spec.md §4.4). `task`/`wave_id` are
    /// accepted for parity with the contract but only used for the event's
    /// identity in callers that choose to log them.
    pub fn consume_iteration(
        &mut self,
        _task: &TaskId,
        _wave_id: u32,
    ) -> Result<BudgetEvent, BudgetError> {
        if let Some(limit) = self.limits.max_iterations {
            if self.used_iterations >= limit {
                self.mark_stop(StopReason::MaxIterations, "iteration budget exhausted");
                return Err(BudgetError::Exceeded(StopReason::MaxIterations));
            }
            self.used_iterations += 1;
            let st = status(self.used_iterations, limit);
            let event = BudgetEvent {
                unit: "steps",
                used: self.used_iterations,
                limit,
                remaining: limit as i64 - self.used_iterations as i64,
                status: st,
                terminal: false,
            };
            self.last_event = Some(event.clone());
            return Ok(event);
        }
        self.used_iterations += 1;
        let event = BudgetEvent {
            unit: "steps",
            used: self.used_iterations,
            limit: 0,
            remaining: i64::MAX,
            status: BudgetStatus::Ok,
            terminal: false,
        };
        self.last_event = Some(event.clone());
        Ok(event)
    }

    /// `reserveToolCall(toolName)` (spec.md §4.4). Checks the duration
    /// budget first, then the tool-call budget.
    pub fn reserve_tool_call(&mut self, tool_name: &str) -> Result<BudgetEvent, String> {
        if let Err(msg) = self.assert_duration("tool-call") {
            return Err(msg);
        }
        if let Some(limit) = self.limits.max_tool_calls {
            if self.used_tool_calls >= limit {
                let msg = format!("tool call budget exhausted before `{tool_name}`");
                self.mark_stop(StopReason::MaxToolCalls, &msg);
                return Err(msg);
            }
            self.used_tool_calls += 1;
            let st = status(self.used_tool_calls, limit);
            let event = BudgetEvent {
                unit: "calls",
                used: self.used_tool_calls,
                limit,
                remaining: limit as i64 - self.used_tool_calls as i64,
                status: st,
                terminal: false,
            };
            self.last_event = Some(event.clone());
            return Ok(event);
        }
        self.used_tool_calls += 1;
        let event = BudgetEvent {
            unit: "calls",
            used: self.used_tool_calls,
            limit: 0,
            remaining: i64::MAX,
            status: BudgetStatus::Ok,
            terminal: false,
        };
        self.last_event = Some(event.clone());
        Ok(event)
    }

    /// `assertDuration(stage)` (spec.md §4.4). Returns an error message
    /// (mirroring the tool-bridge-facing string the model would see) rather
    /// than raising directly, since callers in the duration-check path
    /// (pre-wave checks) want to decide for themselves whether to treat
    /// this as fatal.
    pub fn assert_duration(&mut self, stage: &str) -> Result<(), String> {
        if let Some(limit_ms) = self.limits.max_duration_ms {
            let elapsed_ms = self.elapsed().as_millis() as u64;
            if elapsed_ms >= limit_ms {
                let msg = format!("duration budget exhausted during {stage}");
                self.mark_stop(StopReason::MaxDurationMs, &msg);
                return Err(msg);
            }
        }
        Ok(())
    }

    /// `markStop(reason, message)`: first-writer-wins for `stopReason`/
    /// `stopMessage` (spec.md §4.4, §8 invariant 4), but always refreshes
    /// `last_event` with the terminal `autonomy.budget` payload for this
    /// stop — a terminal `status:exhausted` event for the three count/time
    /// limits, a non-terminal `progress` event for `targetScore`.
    pub fn mark_stop(&mut self, reason: StopReason, message: impl Into<String>) {
        if self.stop_reason.is_none() {
            self.stop_reason = Some(reason);
            self.stop_message = Some(message.into());
        }
        self.last_event = Some(self.terminal_event(reason));
    }

    fn terminal_event(&self, reason: StopReason) -> BudgetEvent {
        match reason {
            StopReason::MaxIterations => {
                let limit = self.limits.max_iterations.unwrap_or(self.used_iterations);
                BudgetEvent {
                    unit: "steps",
                    used: self.used_iterations,
                    limit,
                    remaining: limit as i64 - self.used_iterations as i64,
                    status: BudgetStatus::Exhausted,
                    terminal: true,
                }
            }
            StopReason::MaxToolCalls => {
                let limit = self.limits.max_tool_calls.unwrap_or(self.used_tool_calls);
                BudgetEvent {
                    unit: "calls",
                    used: self.used_tool_calls,
                    limit,
                    remaining: limit as i64 - self.used_tool_calls as i64,
                    status: BudgetStatus::Exhausted,
                    terminal: true,
                }
            }
            StopReason::MaxDurationMs => {
                let elapsed_ms = self.elapsed().as_millis() as u64;
                let limit = self.limits.max_duration_ms.unwrap_or(elapsed_ms);
                BudgetEvent {
                    unit: "ms",
                    used: elapsed_ms,
                    limit,
                    remaining: limit as i64 - elapsed_ms as i64,
                    status: BudgetStatus::Exhausted,
                    terminal: true,
                }
            }
            StopReason::TargetScore => {
                let used = self.final_score.unwrap_or(0) as u64;
                let limit = self.limits.target_score.unwrap_or(0) as u64;
                BudgetEvent {
                    unit: "score",
                    used,
                    limit,
                    remaining: limit as i64 - used as i64,
                    status: BudgetStatus::Warning,
                    terminal: false,
                }
            }
        }
    }

    /// `resolveQualityMaxRounds()` (spec.md §4.4): `min(5, remaining - 1)`
    /// when an iteration budget exists, else 5. If no iterations remain,
    /// marks stop and returns 0.
    pub fn resolve_quality_max_rounds(&mut self) -> u32 {
        match self.limits.max_iterations {
            None => 5,
            Some(limit) => {
                let remaining = limit.saturating_sub(self.used_iterations);
                if remaining == 0 {
                    self.mark_stop(StopReason::MaxIterations, "no iterations remain for quality loop");
                    return 0;
                }
                std::cmp::min(5, remaining.saturating_sub(1)) as u32
            }
        }
    }

    /// Checks the `targetScore` limit against a computed final score; if
    /// set and unmet, raises the `targetScore` stop reason (spec.md §4.8).
    pub fn check_target_score(&mut self, score: u32) -> bool {
        match self.limits.target_score {
            Some(target) if score < target => {
                self.mark_stop(
                    StopReason::TargetScore,
                    format!("score {score} below target {target}"),
                );
                false
            }
            _ => true,
        }
    }
}
