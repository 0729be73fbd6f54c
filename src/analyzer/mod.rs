//! Artifact Analyzer (C7) — deterministic static inspection of the produced
//! workspace (spec.md §4.6). The single largest component in this crate.
//!
//! No teacher module plays this role directly; the teacher's quality gate
//! (`verifier/pipeline.rs`) delegates to `cargo`/`rustc` for everything this
//! module does by hand (import resolution, route/JSX heuristics). The
//! report shape (`analyzer::report::AnalyzerReport`/`AnalyzerIssue`) is
//! grounded on `verifier/report.rs`'s classified-finding-list idiom; the
//! check implementations themselves (`analyzer::checks`) are grounded on
//! `verifier/safety_scan.rs`'s declarative regex-pattern-table style.

pub mod checks;
pub mod report;
pub mod workspace;

use thiserror::Error;

use crate::session::RouteDesignEntry;
use crate::tools::WorkspaceSnapshot;

pub use report::{AnalyzerIssue, AnalyzerReport, IssueKind};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("workspace is empty; nothing to analyze")]
    EmptyWorkspace,
}

/// Run the full check catalog over `workspace`, scoped to its primary
/// workspace root, against the architect's `route_design` (spec.md §4.6).
pub fn analyze(
    workspace: &WorkspaceSnapshot,
    route_design: &[RouteDesignEntry],
) -> Result<AnalyzerReport, AnalyzerError> {
    if workspace.is_empty() {
        return Err(AnalyzerError::EmptyWorkspace);
    }

    let root = workspace::primary_workspace_root(workspace);
    let entry = workspace::detect_entry(workspace, &root);
    let reachable = entry
        .as_ref()
        .map(|e| workspace::reachable_files(e, workspace, &root))
        .unwrap_or_default();

    let ctx = checks::AnalysisContext {
        workspace,
        root: root.clone(),
        entry: entry.clone(),
        reachable,
        route_design,
    };

    Ok(AnalyzerReport {
        workspace_root: root,
        entry_file: entry,
        issues: checks::run_all(&ctx),
    })
}

/// Standalone import-resolution pass used by the Task Runner's repair-agent
/// policy check (spec.md §4.2 step 8, "resolvable-imports invariant").
/// Runs only the unresolved-imports check, independent of route design or
/// the full issue catalog, since the runner only needs the enumerated list
/// of broken specifiers for its retry hint.
pub fn unresolved_imports(workspace: &WorkspaceSnapshot) -> Vec<String> {
    if workspace.is_empty() {
        return Vec::new();
    }
    let root = workspace::primary_workspace_root(workspace);
    let ctx = checks::AnalysisContext {
        workspace,
        root,
        entry: None,
        reachable: Default::default(),
        route_design: &[],
    };
    checks::unresolved_imports(&ctx)
        .into_iter()
        .map(|issue| issue.message)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_workspace_errors() {
        let workspace: WorkspaceSnapshot = HashMap::new();
        assert!(matches!(analyze(&workspace, &[]), Err(AnalyzerError::EmptyWorkspace)));
    }

    #[test]
    fn clean_workspace_reports_no_issues() {
        let workspace: WorkspaceSnapshot = HashMap::from([(
            "src/App.tsx".to_string(),
            r#"import { createRoot } from 'react-dom/client';
import { Routes, Route } from 'react-router-dom';
function App() {
  const [count, setCount] = useState(0);
  return (
    <Routes>
      <Route path="/dashboard" element={<button onClick={() => setCount(count + 1)}>Go</button>} />
    </Routes>
  );
}
createRoot(document.getElementById('root')).render(<App />);
"#
            .to_string(),
        )]);
        let report = analyze(&workspace, &[]).unwrap();
        assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
        assert_eq!(report.entry_file.as_deref(), Some("src/App.tsx"));
    }

    #[test]
    fn unresolved_imports_helper_matches_scenario_3() {
        let workspace: WorkspaceSnapshot = HashMap::from([(
            "src/App.tsx".to_string(),
            "import './missing'\ncreateRoot(el).render(<App/>)".to_string(),
        )]);
        let unresolved = unresolved_imports(&workspace);
        assert_eq!(unresolved.len(), 1);
        assert!(unresolved[0].contains("missing"));
    }
}
