//! Execution plan data model (spec.md §3).
//!
//! An `ExecutionPlan` is the dependency graph of code-generation tasks the
//! Orchestrator drives to completion. It is immutable for the duration of a
//! run — the Wave Scheduler and Task Runner only ever read it.

use serde::{Deserialize, Serialize};

/// Stable identifier for a task within a plan.
pub type TaskId = String;

/// Stable identifier for a tool (`read`, `grep`, `glob`, `bash`,
/// `apply_diff`, `write`, ...).
pub type ToolId = String;

/// The known agent variants a task may be bound to.
///
/// `Quality` and `Repair` are special: the Quality/Repair Loop (C8) schedules
/// them directly rather than them appearing in the user-submitted plan, but
/// they share the same task/runner machinery so they are first-class
/// variants here rather than a separate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentId {
    Scaffold,
    Page,
    State,
    Style,
    Interaction,
    Quality,
    Repair,
}

impl AgentId {
    /// Mutation-required agents are retried up to 3 times when they produce
    /// no file mutations (spec.md §4.2). The quality agent is deliberately
    /// non-mutating and never retried on that basis.
    pub fn is_mutation_required(self) -> bool {
        !matches!(self, AgentId::Quality)
    }

    /// Maximum attempts per spec.md §4.2: 3 for mutation-required
    /// code-generation agents, 1 otherwise.
    pub fn max_attempts(self) -> u32 {
        if self.is_mutation_required() {
            3
        } else {
            1
        }
    }

    /// Whether this agent preserves its full tool whitelist across retries
    /// instead of narrowing to the mutating subset (spec.md §4.2 step 3).
    /// The repair agent needs read/grep/glob throughout its retries to
    /// re-diagnose unresolved imports, so it is exempted from narrowing.
    pub fn preserves_context_on_retry(self) -> bool {
        matches!(self, AgentId::Repair)
    }

    /// Default read-only/mutating tool whitelist per agent, merged with the
    /// task's declared tools in `tools::ToolBridge::select_whitelist`.
    pub fn default_tools(self) -> &'static [&'static str] {
        match self {
            AgentId::Quality => &["read", "grep", "glob", "bash"],
            AgentId::Repair => &["read", "grep", "glob", "apply_diff", "write", "bash"],
            _ => &["read", "grep", "glob", "apply_diff", "write"],
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentId::Scaffold => "scaffold",
            AgentId::Page => "page",
            AgentId::State => "state",
            AgentId::Style => "style",
            AgentId::Interaction => "interaction",
            AgentId::Quality => "quality",
            AgentId::Repair => "repair",
        };
        write!(f, "{s}")
    }
}

/// A single task in an execution plan.
///
/// Immutable for the duration of a run (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlanTask {
    pub id: TaskId,
    pub agent_id: AgentId,
    pub goal: String,
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    #[serde(default)]
    pub tools: Vec<ToolId>,
}

impl ExecutionPlanTask {
    pub fn new(id: impl Into<TaskId>, agent_id: AgentId, goal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id,
            goal: goal.into(),
            depends_on: Vec::new(),
            tools: Vec::new(),
        }
    }

    pub fn depends_on(mut self, ids: impl IntoIterator<Item = impl Into<TaskId>>) -> Self {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = impl Into<ToolId>>) -> Self {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }
}

/// The dependency graph of tasks submitted to the Orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub tasks: Vec<ExecutionPlanTask>,
}

impl ExecutionPlan {
    pub fn new(tasks: Vec<ExecutionPlanTask>) -> Self {
        Self { tasks }
    }

    pub fn get(&self, id: &str) -> Option<&ExecutionPlanTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_required_agents() {
        assert!(AgentId::Scaffold.is_mutation_required());
        assert!(AgentId::Repair.is_mutation_required());
        assert!(!AgentId::Quality.is_mutation_required());
    }

    #[test]
    fn attempt_budgets() {
        assert_eq!(AgentId::Page.max_attempts(), 3);
        assert_eq!(AgentId::Quality.max_attempts(), 1);
    }

    #[test]
    fn plan_lookup() {
        let plan = ExecutionPlan::new(vec![ExecutionPlanTask::new(
            "t1",
            AgentId::Scaffold,
            "bootstrap",
        )]);
        assert!(plan.get("t1").is_some());
        assert!(plan.get("missing").is_none());
    }
}
