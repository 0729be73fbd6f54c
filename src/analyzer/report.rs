//! Issue types returned by the Artifact Analyzer (spec.md §4.6).
//!
//! Grounded on the teacher's `verifier/report.rs` shape (a classified,
//! serializable finding list feeding a downstream decision), adapted from
//! "cargo diagnostic" categories to the analyzer's fixed check catalog.

use serde::{Deserialize, Serialize};

/// Which of the ~13 deterministic checks produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    EmptyContainerPage,
    PlaceholderMarkers,
    LowFidelityPage,
    MissingEntryMount,
    NestedRouterProviders,
    NoRouterComposition,
    GenericOnlyRoutes,
    MissingArchitectRoutes,
    NoInteractionHandlers,
    NoStatefulHooks,
    UnstableStoreSelector,
    UnresolvedImport,
    ImportExportMismatch,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EmptyContainerPage => "empty_container_page",
            Self::PlaceholderMarkers => "placeholder_markers",
            Self::LowFidelityPage => "low_fidelity_page",
            Self::MissingEntryMount => "missing_entry_mount",
            Self::NestedRouterProviders => "nested_router_providers",
            Self::NoRouterComposition => "no_router_composition",
            Self::GenericOnlyRoutes => "generic_only_routes",
            Self::MissingArchitectRoutes => "missing_architect_routes",
            Self::NoInteractionHandlers => "no_interaction_handlers",
            Self::NoStatefulHooks => "no_stateful_hooks",
            Self::UnstableStoreSelector => "unstable_store_selector",
            Self::UnresolvedImport => "unresolved_import",
            Self::ImportExportMismatch => "import_export_mismatch",
        };
        write!(f, "{s}")
    }
}

/// One concrete defect found by a check, as a one-line human-readable issue
/// (spec.md §4.6 "each emits a one-line issue").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerIssue {
    pub kind: IssueKind,
    pub file: Option<String>,
    pub message: String,
}

impl AnalyzerIssue {
    pub fn new(kind: IssueKind, file: Option<impl Into<String>>, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.map(Into::into),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AnalyzerIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Full analyzer pass result: the primary workspace root it scoped to, the
/// detected entry file (if any), and the de-duplicated issue list (spec.md
/// §4.6, "Returns a de-duplicated list").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerReport {
    pub workspace_root: String,
    pub entry_file: Option<String>,
    pub issues: Vec<AnalyzerIssue>,
}

impl AnalyzerReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// One-line issue messages, de-duplicated, in check order — the shape
    /// the Quality/Repair Loop feeds into a repair-agent task goal.
    pub fn issue_messages(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.issues
            .iter()
            .map(|i| i.message.clone())
            .filter(|m| seen.insert(m.clone()))
            .collect()
    }
}
