//! Session input data — `SessionDocument`s and the per-task execution
//! context (spec.md §3, §6).
//!
//! These are consumed, not produced, by the core: the prompt builder and the
//! Artifact Analyzer both read them, but nothing in this crate mutates them
//! after a run starts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::plan::{ExecutionPlan, ExecutionPlanTask};

/// A single route entry from the frontend architect's route design, used by
/// the Artifact Analyzer's missing-architect-routes check (spec.md §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDesignEntry {
    pub path: String,
    #[serde(default)]
    pub description: String,
}

/// One of the four upstream analysis documents produced before orchestration
/// begins. The core only reads fields it needs for routing/analysis; it does
/// not interpret the full analysis payloads (those are opaque to this crate
/// per spec.md §1 — prompt content is out of scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SessionDocument {
    ProductManager { summary: String },
    FrontendArchitect {
        summary: String,
        #[serde(default)]
        route_design: Vec<RouteDesignEntry>,
    },
    UiExpert { summary: String },
    UxExpert { summary: String },
}

impl SessionDocument {
    /// Route design entries, if this is the frontend-architect document.
    pub fn route_design(&self) -> &[RouteDesignEntry] {
        match self {
            SessionDocument::FrontendArchitect { route_design, .. } => route_design,
            _ => &[],
        }
    }
}

/// Collects the architect's route design across all supplied session
/// documents (there should be at most one, but callers may pass an
/// unfiltered set).
pub fn collect_route_design(docs: &[SessionDocument]) -> Vec<RouteDesignEntry> {
    docs.iter().flat_map(|d| d.route_design().to_vec()).collect()
}

/// Context passed to an agent's `buildPrompt` (external collaborator,
/// spec.md §6) and to the Task Runner for attempt bookkeeping.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub session_id: String,
    pub run_id: String,
    pub user_message: String,
    pub platform: Option<String>,
    pub tech_stack: Vec<String>,
    pub session_documents: Vec<SessionDocument>,
    pub plan: ExecutionPlan,
}

impl ExecutionContext {
    /// Frontend-architect route design, flattened, for the Artifact
    /// Analyzer's route-coverage check.
    pub fn route_design(&self) -> Vec<RouteDesignEntry> {
        collect_route_design(&self.session_documents)
    }

    pub fn task(&self, id: &str) -> Option<&ExecutionPlanTask> {
        self.plan.get(id)
    }
}

/// Extra metadata stashed alongside a task-run invocation; kept separate
/// from `ExecutionContext` because it varies per attempt (wave index) while
/// the context is constant for the run.
#[derive(Debug, Clone, Default)]
pub struct RunMetadata {
    pub extra: HashMap<String, String>,
}
