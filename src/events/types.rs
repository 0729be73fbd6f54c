//! Runtime event catalog (spec.md §4.7).
//!
//! Every event a run produces is wrapped in a `RuntimeEvent` envelope
//! carrying `sequence` (monotonic per run), `timestamp`, `level`, and
//! optional `groupId`/`parentId` for correlation. The envelope's `kind`
//! is a tagged union over the fixed event catalog the spec names:
//! `agent.task.progress`, `tool.call.{started,progress,completed,failed}`,
//! `patch.intent.submitted`, `patch.batch.merged`,
//! `conflict.{detected,resolved}`, `quality.gate.updated`,
//! `autonomy.{iteration,budget,decision}`, `render.pipeline.stage`,
//! `run.{completed,error}`.
//!
//! Grounded on the teacher's `EnsembleEvent` (a tagged enum, one variant
//! per domain event, `event_type()`/`session_id()`/`task_id()` accessors) —
//! the domain is entirely different, but the "one tagged enum per catalog,
//! cheap accessor methods for correlation" idiom carries over directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity/category a sink can use to decide how to surface an event
/// (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Progress,
    Success,
    Error,
}

/// The full runtime event catalog (spec.md §4.7), tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuntimeEventKind {
    #[serde(rename = "agent.task.progress", rename_all = "camelCase")]
    AgentTaskProgress {
        task_id: String,
        agent_id: String,
        attempt: u32,
        message: String,
    },
    #[serde(rename = "tool.call.started", rename_all = "camelCase")]
    ToolCallStarted {
        task_id: String,
        tool_id: String,
        tool_name: String,
    },
    #[serde(rename = "tool.call.progress", rename_all = "camelCase")]
    ToolCallProgress {
        task_id: String,
        tool_id: String,
        message: String,
    },
    #[serde(rename = "tool.call.completed", rename_all = "camelCase")]
    ToolCallCompleted {
        task_id: String,
        tool_id: String,
        duration_ms: u64,
    },
    #[serde(rename = "tool.call.failed", rename_all = "camelCase")]
    ToolCallFailed {
        task_id: String,
        tool_id: String,
        error: String,
    },
    #[serde(rename = "patch.intent.submitted", rename_all = "camelCase")]
    PatchIntentSubmitted {
        wave_id: u32,
        task_id: String,
        file_path: String,
        content_hash: String,
    },
    #[serde(rename = "patch.batch.merged", rename_all = "camelCase")]
    PatchBatchMerged {
        wave_id: u32,
        touched_files: Vec<String>,
        conflicts: usize,
    },
    #[serde(rename = "conflict.detected", rename_all = "camelCase")]
    ConflictDetected {
        wave_id: u32,
        file_path: String,
        candidate_task_ids: Vec<String>,
    },
    #[serde(rename = "conflict.resolved", rename_all = "camelCase")]
    ConflictResolved {
        wave_id: u32,
        file_path: String,
        winner_task_id: String,
    },
    #[serde(rename = "quality.gate.updated", rename_all = "camelCase")]
    QualityGateUpdated {
        gate: String,
        status: String,
        summary: String,
    },
    #[serde(rename = "autonomy.iteration", rename_all = "camelCase")]
    AutonomyIteration { iteration: u32, wave_id: u32 },
    #[serde(rename = "autonomy.budget", rename_all = "camelCase")]
    AutonomyBudget {
        unit: &'static str,
        used: u64,
        limit: u64,
        remaining: i64,
        status: crate::budget::BudgetStatus,
        terminal: bool,
    },
    #[serde(rename = "autonomy.decision", rename_all = "camelCase")]
    AutonomyDecision { decision: String, reason: String },
    #[serde(rename = "render.pipeline.stage", rename_all = "camelCase")]
    RenderPipelineStage { stage: String, detail: String },
    #[serde(rename = "run.completed", rename_all = "camelCase")]
    RunCompleted { success: bool, final_score: i64 },
    #[serde(rename = "run.error", rename_all = "camelCase")]
    RunError { message: String },
}

impl RuntimeEventKind {
    /// The dotted `type` tag, for filtering and display.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AgentTaskProgress { .. } => "agent.task.progress",
            Self::ToolCallStarted { .. } => "tool.call.started",
            Self::ToolCallProgress { .. } => "tool.call.progress",
            Self::ToolCallCompleted { .. } => "tool.call.completed",
            Self::ToolCallFailed { .. } => "tool.call.failed",
            Self::PatchIntentSubmitted { .. } => "patch.intent.submitted",
            Self::PatchBatchMerged { .. } => "patch.batch.merged",
            Self::ConflictDetected { .. } => "conflict.detected",
            Self::ConflictResolved { .. } => "conflict.resolved",
            Self::QualityGateUpdated { .. } => "quality.gate.updated",
            Self::AutonomyIteration { .. } => "autonomy.iteration",
            Self::AutonomyBudget { .. } => "autonomy.budget",
            Self::AutonomyDecision { .. } => "autonomy.decision",
            Self::RenderPipelineStage { .. } => "render.pipeline.stage",
            Self::RunCompleted { .. } => "run.completed",
            Self::RunError { .. } => "run.error",
        }
    }

    /// The task this event pertains to, if any — used for task-scoped
    /// history queries.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::AgentTaskProgress { task_id, .. }
            | Self::ToolCallStarted { task_id, .. }
            | Self::ToolCallProgress { task_id, .. }
            | Self::ToolCallCompleted { task_id, .. }
            | Self::ToolCallFailed { task_id, .. }
            | Self::PatchIntentSubmitted { task_id, .. } => Some(task_id),
            Self::ConflictResolved { winner_task_id, .. } => Some(winner_task_id),
            _ => None,
        }
    }

    /// The wave this event pertains to, if any.
    pub fn wave_id(&self) -> Option<u32> {
        match self {
            Self::PatchIntentSubmitted { wave_id, .. }
            | Self::PatchBatchMerged { wave_id, .. }
            | Self::ConflictDetected { wave_id, .. }
            | Self::ConflictResolved { wave_id, .. }
            | Self::AutonomyIteration { wave_id, .. } => Some(*wave_id),
            _ => None,
        }
    }
}

/// An emitted runtime event: the catalog payload plus the envelope fields
/// every event carries regardless of kind (spec.md §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvent {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(flatten)]
    pub kind: RuntimeEventKind,
}

impl RuntimeEvent {
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn task_id(&self) -> Option<&str> {
        self.kind.task_id()
    }

    pub fn wave_id(&self) -> Option<u32> {
        self.kind.wave_id()
    }
}
