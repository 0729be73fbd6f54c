//! Execution Orchestration Core
//!
//! This library drives a single AI code-generation run end to end:
//!
//! - [`plan`] / [`session`]: the execution plan (agents, task graph,
//!   dependencies) and the session context a run carries (documents,
//!   platform, tech stack).
//! - [`scheduler`]: topological wave scheduling over the plan's task graph.
//! - [`llm`] / [`tools`]: the adapter traits a host implements (LLM
//!   completion, tool execution, file storage, prompt building) and the
//!   built-in tool schema registry.
//! - [`runner`]: per-task attempt state machine — bounded retries, timeout
//!   escalation, transient-error classification.
//! - [`patch`]: patch intents and conflict-aware merge.
//! - [`blackboard`]: the shared, run-scoped coordination store (workspace
//!   snapshot, patch intents, conflicts, quality gate state).
//! - [`analyzer`]: deterministic static checks over the workspace snapshot.
//! - [`quality`]: the quality/repair loop built on the analyzer and a
//!   model-reported pass/fail signal.
//! - [`score`]: final run scoring and target-score gating.
//! - [`budget`]: iteration/tool-call/duration/token budget enforcement.
//! - [`config`]: execution agent configuration.
//! - [`events`]: the runtime event stream (sequenced, leveled, grouped) and
//!   its in-memory replay/query surface.
//! - [`orchestrator`]: the top-level pipeline tying all of the above
//!   together into a single [`orchestrator::Orchestrator::run`] call.

#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

pub mod analyzer;
pub mod blackboard;
pub mod budget;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod orchestrator;
pub mod patch;
pub mod plan;
pub mod quality;
pub mod runner;
pub mod scheduler;
pub mod score;
pub mod session;
pub mod tools;

pub use error::{OrchestratorError, OrchestratorResult};

pub use plan::{AgentId, ExecutionPlan, ExecutionPlanTask, TaskId, ToolId};
pub use session::{
    collect_route_design, ExecutionContext, RouteDesignEntry, RunMetadata, SessionDocument,
};

pub use scheduler::{schedule, ScheduleError, Wave};

pub use llm::{
    BudgetGate, CompletionRequest, CompletionResult, FileStorage, FinishReason, LlmAdapter,
    PromptBuilder, ToolCall, ToolExecutor, ToolResult, Usage,
};
pub use tools::{
    default_registry, diff_snapshots, to_json_schema, ParameterSchema, ToolBridge, ToolDefinition,
    WorkspaceSnapshot,
};

pub use runner::state_machine::{AttemptState, AttemptStateMachine, IllegalTransition};
pub use runner::{RunnerError, TaskResult, TaskRunner};

pub use patch::{
    content_hash, normalize_path, ConflictRecord, ConflictStatus, Millis, MergedPatchBatch,
    PatchIntent, PatchMerger,
};

pub use blackboard::{Blackboard, GateName, GateStatus, QualityGateState, SharedBlackboard};

pub use analyzer::{analyze, unresolved_imports, AnalyzerError, AnalyzerIssue, AnalyzerReport, IssueKind};

pub use quality::{QualityError, QualityOutcome, ARTIFACT_QUALITY_GATE};

pub use score::{apply_target_score, compute_score, ScoreInput};

pub use budget::{
    create_budget_state, status as budget_status, BudgetError, BudgetEvent, BudgetStatus,
    ExecutionBudgetState, RuntimeBudgetInput, StopReason,
};

pub use config::ExecutionAgentConfig;

pub use events::{
    EventBus, EventBusError, EventBusExt, EventBusResult, EventFilter, EventHistory, EventLevel,
    EventStats, FilteredReceiver, ReplayStats, RuntimeEvent, RuntimeEventKind, SharedEventBus,
    SharedEventHistory,
};

pub use orchestrator::{AbortSignal, BudgetUsage, Orchestrator, RunInput, RunOutput, RunSummary};
