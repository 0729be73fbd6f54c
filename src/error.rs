//! Top-level error aggregation.
//!
//! Individual components define their own `thiserror` enums (`ScheduleError`,
//! `MergeError`, `BudgetError`, `RunnerError`, `AnalyzerError`,
//! `QualityError`). `OrchestratorError` wraps them with `#[from]` so the
//! binary boundary (`main.rs`) can flatten everything into a single
//! `anyhow::Result` without every call site matching on component errors.

use thiserror::Error;

use crate::budget::BudgetError;
use crate::quality::QualityError;
use crate::runner::RunnerError;
use crate::scheduler::ScheduleError;

/// Errors that can propagate out of the orchestrator boundary.
///
/// Per spec.md §7, only `BudgetExceededError`-shaped and programming errors
/// (unknown agent id, schedule cycle) ever cross this boundary — everything
/// else is captured as a `TaskResult`/`QualityGateState` and folded into the
/// orchestrator's output payload.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("budget exceeded: {0}")]
    Budget(#[from] BudgetError),

    #[error("unknown agent id: {0}")]
    UnknownAgent(String),

    #[error("quality loop error: {0}")]
    Quality(#[from] QualityError),

    #[error("task runner error: {0}")]
    Runner(#[from] RunnerError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
