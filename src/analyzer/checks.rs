//! The ~13 deterministic checks the Artifact Analyzer runs (spec.md §4.6).
//!
//! Each check is a free function taking the workspace context and returning
//! zero or more `AnalyzerIssue`s. `run_all` composes them in spec order.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::analyzer::report::{AnalyzerIssue, IssueKind};
use crate::analyzer::workspace::{
    self, classify_specifier, extract_imports, resolve_specifier, SpecifierKind,
};
use crate::session::RouteDesignEntry;
use crate::tools::WorkspaceSnapshot;

/// Everything a single check needs: the scoped workspace, its primary root,
/// the detected entry file, and the files reachable from it.
pub struct AnalysisContext<'a> {
    pub workspace: &'a WorkspaceSnapshot,
    pub root: String,
    pub entry: Option<String>,
    pub reachable: HashSet<String>,
    pub route_design: &'a [RouteDesignEntry],
}

static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(todo|fixme|coming soon|placeholder component|占位页面|示例数据|mock数据)").unwrap()
});
static JSX_PLACEHOLDER_ATTR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"placeholder\s*=\s*(\{[^}]*\}|"[^"]*"|'[^']*')"#).unwrap());
static PAGE_LIKE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(App\.tsx$|.*Page\.[jt]sx?$)").unwrap());
static EMPTY_CONTAINER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"return\s*\(\s*<[A-Za-z][\w.]*\s*/?>\s*\)|return\s*<[A-Za-z][\w.]*\s*/>").unwrap());
static INTERACTION_HANDLER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bon(Click|Change|Submit|Input|KeyDown|KeyUp|Focus|Blur)\s*=").unwrap()
});
static STATEFUL_HOOK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\buse(State|Reducer|Memo|Effect|Ref)\s*\(").unwrap());
static ROUTER_COMPOSITION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Routes|Route|useRoutes|createBrowserRouter|RouterProvider|Navigate)\b").unwrap()
});
static ROUTER_PROVIDER_JSX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(BrowserRouter|RouterProvider)\b").unwrap());
static DECLARED_ROUTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:path|to)\s*[:=]\s*["']([^"']+)["']"#).unwrap());
static STORE_SELECTOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"use\w*Store\s*\(\s*\(?\s*\w*\s*\)?\s*=>\s*\(\s*\{").unwrap()
});
static GENERIC_ROUTE_SEGMENTS: &[&str] = &[
    "dashboard", "home", "settings", "list", "index", "main", "overview", "page",
];

fn strip_placeholder_attrs(content: &str) -> String {
    JSX_PLACEHOLDER_ATTR_PATTERN.replace_all(content, "").into_owned()
}

fn is_page_like(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    PAGE_LIKE_PATTERN.is_match(name)
}

pub fn empty_container_page(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    workspace::scoped_ui_files(ctx.workspace, &ctx.root)
        .into_iter()
        .filter(|p| is_page_like(p) && ctx.reachable.contains(p.as_str()))
        .filter_map(|path| {
            let content = ctx.workspace.get(path)?;
            EMPTY_CONTAINER_PATTERN.is_match(content).then(|| {
                AnalyzerIssue::new(
                    IssueKind::EmptyContainerPage,
                    Some(path.clone()),
                    format!("{path} renders an empty container with no real content"),
                )
            })
        })
        .collect()
}

pub fn placeholder_markers(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    workspace::scoped_ui_files(ctx.workspace, &ctx.root)
        .into_iter()
        .filter(|p| ctx.reachable.contains(p.as_str()))
        .filter_map(|path| {
            let content = ctx.workspace.get(path)?;
            let stripped = strip_placeholder_attrs(content);
            PLACEHOLDER_PATTERN.is_match(&stripped).then(|| {
                AnalyzerIssue::new(
                    IssueKind::PlaceholderMarkers,
                    Some(path.clone()),
                    format!("{path} contains placeholder/TODO content"),
                )
            })
        })
        .collect()
}

pub fn low_fidelity_page(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    workspace::scoped_ui_files(ctx.workspace, &ctx.root)
        .into_iter()
        .filter(|p| is_page_like(p) && ctx.reachable.contains(p.as_str()))
        .filter_map(|path| {
            let content = ctx.workspace.get(path)?;
            let compact = content.len() < 400;
            let no_interaction = !INTERACTION_HANDLER_PATTERN.is_match(content);
            let no_router = !ROUTER_COMPOSITION_PATTERN.is_match(content);
            (compact && no_interaction && no_router).then(|| {
                AnalyzerIssue::new(
                    IssueKind::LowFidelityPage,
                    Some(path.clone()),
                    format!("{path} is a low-fidelity page: no interactive elements or routing"),
                )
            })
        })
        .collect()
}

pub fn missing_entry_mount(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let Some(entry) = &ctx.entry else {
        return vec![AnalyzerIssue::new(
            IssueKind::MissingEntryMount,
            None::<String>,
            "no runtime entry file with a React-root mount was found".to_string(),
        )];
    };
    let Some(content) = ctx.workspace.get(entry) else {
        return Vec::new();
    };
    let has_mount = Regex::new(r"createRoot\s*\([\s\S]*?\)\s*\.\s*render\s*\(")
        .unwrap()
        .is_match(content);
    let composed_with_app = ROUTER_COMPOSITION_PATTERN.is_match(content) || content.contains("<App");
    if !has_mount || !composed_with_app {
        return vec![AnalyzerIssue::new(
            IssueKind::MissingEntryMount,
            Some(entry.clone()),
            format!("{entry} does not mount a React root composed with a router or App shell"),
        )];
    }
    Vec::new()
}

pub fn nested_router_providers(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let Some(entry) = &ctx.entry else {
        return Vec::new();
    };
    let entry_has_provider = ctx
        .workspace
        .get(entry)
        .map(|c| ROUTER_PROVIDER_JSX_PATTERN.is_match(c))
        .unwrap_or(false);
    if !entry_has_provider {
        return Vec::new();
    }
    workspace::scoped_ui_files(ctx.workspace, &ctx.root)
        .into_iter()
        .filter(|p| p.as_str() != entry.as_str() && ctx.reachable.contains(p.as_str()))
        .filter_map(|path| {
            let content = ctx.workspace.get(path)?;
            ROUTER_PROVIDER_JSX_PATTERN.is_match(content).then(|| {
                AnalyzerIssue::new(
                    IssueKind::NestedRouterProviders,
                    Some(path.clone()),
                    format!("{path} declares a second router provider nested under {entry}'s"),
                )
            })
        })
        .collect()
}

fn app_shell_content<'a>(ctx: &'a AnalysisContext) -> Vec<(&'a String, &'a String)> {
    workspace::scoped_ui_files(ctx.workspace, &ctx.root)
        .into_iter()
        .filter(|p| ctx.reachable.contains(p.as_str()))
        .filter_map(|path| ctx.workspace.get(path).map(|c| (path, c)))
        .collect()
}

pub fn no_router_composition(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let shell = app_shell_content(ctx);
    let composed = shell.iter().any(|(_, c)| ROUTER_COMPOSITION_PATTERN.is_match(c));
    if shell.is_empty() || composed {
        return Vec::new();
    }
    vec![AnalyzerIssue::new(
        IssueKind::NoRouterComposition,
        ctx.entry.clone(),
        "no router composition found (Routes/Route/useRoutes/createBrowserRouter/RouterProvider/Navigate)"
            .to_string(),
    )]
}

fn canonicalize_route(path: &str) -> String {
    let path = path.trim_end_matches('/');
    if let Some(stripped) = path.strip_suffix("ies") {
        format!("{stripped}y")
    } else if let Some(stripped) = path.strip_suffix('s') {
        stripped.to_string()
    } else {
        path.to_string()
    }
}

fn declared_routes(ctx: &AnalysisContext) -> Vec<String> {
    let mut routes = Vec::new();
    for (_, content) in app_shell_content(ctx) {
        for cap in DECLARED_ROUTE_PATTERN.captures_iter(content) {
            routes.push(cap[1].to_string());
        }
    }
    routes.sort();
    routes.dedup();
    routes
}

pub fn generic_only_routes(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let routes = declared_routes(ctx);
    if routes.len() < 3 {
        return Vec::new();
    }
    let all_generic = routes.iter().all(|r| {
        let segment = r.trim_start_matches('/').split('/').next().unwrap_or("");
        GENERIC_ROUTE_SEGMENTS.contains(&segment)
    });
    if all_generic {
        vec![AnalyzerIssue::new(
            IssueKind::GenericOnlyRoutes,
            ctx.entry.clone(),
            format!(
                "all {} declared routes use generic segment names; architect's semantic routes appear dropped",
                routes.len()
            ),
        )]
    } else {
        Vec::new()
    }
}

/// Coverage succeeds if the declared path equals, is a prefix/descendant
/// of, or canonicalizes equal to, the expected path (spec.md §4.6).
fn route_is_covered(expected: &str, declared: &[String]) -> bool {
    let expected_canon = canonicalize_route(expected);
    declared.iter().any(|d| {
        d == expected
            || d.starts_with(expected)
            || expected.starts_with(d.as_str())
            || canonicalize_route(d) == expected_canon
    })
}

pub fn missing_architect_routes(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    if ctx.route_design.is_empty() {
        return Vec::new();
    }
    let declared = declared_routes(ctx);
    ctx.route_design
        .iter()
        .filter(|expected| !route_is_covered(&expected.path, &declared))
        .map(|expected| {
            AnalyzerIssue::new(
                IssueKind::MissingArchitectRoutes,
                ctx.entry.clone(),
                format!("architect route '{}' has no matching declared route", expected.path),
            )
        })
        .collect()
}

pub fn no_interaction_handlers(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let shell = app_shell_content(ctx);
    if shell.is_empty() || shell.iter().any(|(_, c)| INTERACTION_HANDLER_PATTERN.is_match(c)) {
        return Vec::new();
    }
    vec![AnalyzerIssue::new(
        IssueKind::NoInteractionHandlers,
        ctx.entry.clone(),
        "no interaction handlers (onClick/onChange/onSubmit/...) found in scope".to_string(),
    )]
}

pub fn no_stateful_hooks(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let shell = app_shell_content(ctx);
    if shell.is_empty() || shell.iter().any(|(_, c)| STATEFUL_HOOK_PATTERN.is_match(c)) {
        return Vec::new();
    }
    vec![AnalyzerIssue::new(
        IssueKind::NoStatefulHooks,
        ctx.entry.clone(),
        "no stateful hooks (useState/useReducer/useMemo/useEffect/useRef) found in scope".to_string(),
    )]
}

pub fn unstable_store_selector(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    workspace::scoped_ui_files(ctx.workspace, &ctx.root)
        .into_iter()
        .filter(|p| ctx.reachable.contains(p.as_str()))
        .filter_map(|path| {
            let content = ctx.workspace.get(path)?;
            STORE_SELECTOR_PATTERN.is_match(content).then(|| {
                AnalyzerIssue::new(
                    IssueKind::UnstableStoreSelector,
                    Some(path.clone()),
                    format!("{path} selects a fresh object literal from a store hook; this re-renders every tick"),
                )
            })
        })
        .collect()
}

/// For every import specifier in every workspace file, try to resolve it.
/// Unlike the fidelity checks, this scans *all* workspace files, not just
/// reachable ones (spec.md §4.6: "all workspace files are scored for
/// import resolution").
pub fn unresolved_imports(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let mut issues = Vec::new();
    let mut files: Vec<&String> = ctx.workspace.keys().filter(|p| workspace::is_ui_source_file(p)).collect();
    files.sort();
    for path in files {
        let Some(content) = ctx.workspace.get(path) else {
            continue;
        };
        for specifier in extract_imports(content) {
            if classify_specifier(&specifier) == SpecifierKind::External {
                continue;
            }
            if let Some(None) = resolve_specifier(path, &specifier, ctx.workspace, &ctx.root) {
                issues.push(AnalyzerIssue::new(
                    IssueKind::UnresolvedImport,
                    Some(path.clone()),
                    format!("{path} has unresolved import \"{specifier}\""),
                ));
            }
        }
    }
    issues
}

static NAMED_IMPORT_CLAUSE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:(\w+)\s*,\s*)?(?:\{([^}]*)\}\s*)?from\s+['"]([^'"]+)['"]"#).unwrap()
});
static NAMED_EXPORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+(?:const|function|class|let|var)\s+(\w+)").unwrap());
static NAMED_EXPORT_BRACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s*\{([^}]*)\}").unwrap());
static DEFAULT_EXPORT_CHECK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+default\b").unwrap());

fn exported_symbols(content: &str) -> (bool, HashSet<String>) {
    let has_default = DEFAULT_EXPORT_CHECK.is_match(content);
    let mut named = HashSet::new();
    for cap in NAMED_EXPORT_PATTERN.captures_iter(content) {
        named.insert(cap[1].to_string());
    }
    for cap in NAMED_EXPORT_BRACE_PATTERN.captures_iter(content) {
        for symbol in cap[1].split(',') {
            let symbol = symbol.trim().split_whitespace().next().unwrap_or("").trim();
            if !symbol.is_empty() {
                named.insert(symbol.to_string());
            }
        }
    }
    (has_default, named)
}

/// If an import clause names a default or named symbol the target module
/// does not export, report it (spec.md §4.6).
pub fn import_export_mismatch(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let mut issues = Vec::new();
    let mut files: Vec<&String> = ctx.workspace.keys().filter(|p| workspace::is_ui_source_file(p)).collect();
    files.sort();
    for path in files {
        let Some(content) = ctx.workspace.get(path) else {
            continue;
        };
        for cap in NAMED_IMPORT_CLAUSE_PATTERN.captures_iter(content) {
            let default_binding = cap.get(1).map(|m| m.as_str());
            let named_bindings = cap.get(2).map(|m| m.as_str()).unwrap_or("");
            let specifier = &cap[3];
            if classify_specifier(specifier) == SpecifierKind::External {
                continue;
            }
            let Some(Some(resolved)) = resolve_specifier(path, specifier, ctx.workspace, &ctx.root) else {
                continue;
            };
            let Some(target) = ctx.workspace.get(&resolved) else {
                continue;
            };
            let (has_default, named) = exported_symbols(target);
            if let Some(default_name) = default_binding {
                if !has_default {
                    issues.push(AnalyzerIssue::new(
                        IssueKind::ImportExportMismatch,
                        Some(path.clone()),
                        format!("{path} imports default `{default_name}` from {resolved}, which has no default export"),
                    ));
                }
            }
            for name in named_bindings.split(',') {
                let name = name.trim().split_whitespace().next().unwrap_or("").trim();
                if name.is_empty() {
                    continue;
                }
                if !named.contains(name) {
                    issues.push(AnalyzerIssue::new(
                        IssueKind::ImportExportMismatch,
                        Some(path.clone()),
                        format!("{path} imports `{name}` from {resolved}, which does not export it"),
                    ));
                }
            }
        }
    }
    issues
}

pub fn run_all(ctx: &AnalysisContext) -> Vec<AnalyzerIssue> {
    let mut issues = Vec::new();
    issues.extend(empty_container_page(ctx));
    issues.extend(placeholder_markers(ctx));
    issues.extend(low_fidelity_page(ctx));
    issues.extend(missing_entry_mount(ctx));
    issues.extend(nested_router_providers(ctx));
    issues.extend(no_router_composition(ctx));
    issues.extend(generic_only_routes(ctx));
    issues.extend(missing_architect_routes(ctx));
    issues.extend(no_interaction_handlers(ctx));
    issues.extend(no_stateful_hooks(ctx));
    issues.extend(unstable_store_selector(ctx));
    issues.extend(unresolved_imports(ctx));
    issues.extend(import_export_mismatch(ctx));

    let mut seen = HashSet::new();
    issues.retain(|issue| seen.insert(issue.message.clone()));
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx<'a>(workspace: &'a WorkspaceSnapshot, route_design: &'a [RouteDesignEntry]) -> AnalysisContext<'a> {
        let root = workspace::primary_workspace_root(workspace);
        let entry = workspace::detect_entry(workspace, &root);
        let reachable = entry
            .as_ref()
            .map(|e| workspace::reachable_files(e, workspace, &root))
            .unwrap_or_default();
        AnalysisContext {
            workspace,
            root,
            entry,
            reachable,
            route_design,
        }
    }

    #[test]
    fn detects_unresolved_import() {
        let workspace: WorkspaceSnapshot = HashMap::from([(
            "src/App.tsx".to_string(),
            "import './missing'\nexport default function App() {}".to_string(),
        )]);
        let c = ctx(&workspace, &[]);
        let issues = unresolved_imports(&c);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::UnresolvedImport);
    }

    #[test]
    fn detects_placeholder_markers_but_ignores_placeholder_attr() {
        let workspace: WorkspaceSnapshot = HashMap::from([(
            "src/App.tsx".to_string(),
            r#"createRoot(el).render(<App/>); const x = <input placeholder="search" />; // TODO: finish"#
                .to_string(),
        )]);
        let c = ctx(&workspace, &[]);
        let issues = placeholder_markers(&c);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("placeholder"));
    }

    #[test]
    fn generic_only_routes_flagged() {
        let workspace: WorkspaceSnapshot = HashMap::from([(
            "src/App.tsx".to_string(),
            r#"createRoot(el).render(<App/>);
            <Routes>
              <Route path="/dashboard" />
              <Route path="/settings" />
              <Route path="/list" />
            </Routes>"#
                .to_string(),
        )]);
        let c = ctx(&workspace, &[]);
        let issues = generic_only_routes(&c);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn missing_architect_route_reported() {
        let workspace: WorkspaceSnapshot = HashMap::from([(
            "src/App.tsx".to_string(),
            r#"createRoot(el).render(<App/>); <Routes><Route path="/dashboard" /></Routes>"#.to_string(),
        )]);
        let design = vec![RouteDesignEntry {
            path: "/projects".to_string(),
            description: "projects".to_string(),
        }];
        let c = ctx(&workspace, &design);
        let issues = missing_architect_routes(&c);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn architect_route_covered_by_canonicalization() {
        let declared = vec!["/project".to_string()];
        assert!(route_is_covered("/projects", &declared));
    }

    #[test]
    fn import_export_mismatch_detects_missing_named_export() {
        let workspace: WorkspaceSnapshot = HashMap::from([
            (
                "src/App.tsx".to_string(),
                "import { MissingThing } from './lib'\ncreateRoot(el).render(<App/>)".to_string(),
            ),
            (
                "src/lib.tsx".to_string(),
                "export const RealThing = 1;".to_string(),
            ),
        ]);
        let c = ctx(&workspace, &[]);
        let issues = import_export_mismatch(&c);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("MissingThing"));
    }

    #[test]
    fn unstable_store_selector_detected() {
        let workspace: WorkspaceSnapshot = HashMap::from([(
            "src/Widget.tsx".to_string(),
            "const { a, b } = useAppStore((state) => ({ a: state.a, b: state.b }))".to_string(),
        )]);
        let c = ctx(&workspace, &[]);
        let issues = unstable_store_selector(&c);
        assert_eq!(issues.len(), 1);
    }
}
