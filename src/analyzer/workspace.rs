//! Workspace scoping, entry detection, and import resolution primitives
//! for the Artifact Analyzer (spec.md §4.6).
//!
//! No direct teacher precedent — the teacher's quality gates shell out to
//! `cargo`/`rustc` for these questions. This module is new, grounded on the
//! teacher's declarative-pattern-table idiom (`verifier/safety_scan.rs`'s
//! `PATTERNS: &[Pattern]`) for the regex-driven scoring and check rules.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;

use crate::tools::WorkspaceSnapshot;

/// Extensions considered UI source (spec.md §4.6 "workspace scoping").
const UI_SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Extension list tried when resolving a bare import specifier (spec.md
/// §4.6 "reachability").
const RESOLVE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "json", "css", "scss", "sass", "less", "pcss", "styl", "svg", "png",
    "jpg", "jpeg", "webp", "gif",
];

pub fn to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

/// `src/**/*.{ts,tsx,js,jsx}` excluding `*.test.*` (spec.md §4.6).
pub fn is_ui_source_file(path: &str) -> bool {
    let path = to_posix(path);
    if !path.contains("/src/") && !path.starts_with("src/") {
        return false;
    }
    if path.contains(".test.") {
        return false;
    }
    let Some(ext) = path.rsplit('.').next() else {
        return false;
    };
    UI_SOURCE_EXTENSIONS.contains(&ext)
}

/// The path prefix a UI file's workspace lives under — everything before
/// the `src/` segment, or the empty root if the file is top-level `src/…`.
fn workspace_root_for(path: &str) -> String {
    if let Some(idx) = path.find("/src/") {
        path[..idx].to_string()
    } else {
        String::new()
    }
}

/// Pick the path prefix hosting the largest count of UI source files; ties
/// broken by shallower depth, then shorter prefix (spec.md §4.6).
pub fn primary_workspace_root(workspace: &WorkspaceSnapshot) -> String {
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for path in workspace.keys() {
        let path = to_posix(path);
        if !is_ui_source_file(&path) {
            continue;
        }
        *counts.entry(workspace_root_for(&path)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(root_a, count_a), (root_b, count_b)| {
            count_a
                .cmp(count_b)
                .then_with(|| {
                    let depth_a = root_a.matches('/').count();
                    let depth_b = root_b.matches('/').count();
                    depth_b.cmp(&depth_a)
                })
                .then_with(|| root_b.len().cmp(&root_a.len()))
        })
        .map(|(root, _)| root)
        .unwrap_or_default()
}

/// Whether `path` lives under `root` (the empty root matches everything).
pub fn under_root(path: &str, root: &str) -> bool {
    if root.is_empty() {
        true
    } else {
        path == root || path.starts_with(&format!("{root}/"))
    }
}

/// UI source files scoped to `root`, sorted for determinism.
pub fn scoped_ui_files<'a>(workspace: &'a WorkspaceSnapshot, root: &str) -> Vec<&'a String> {
    let mut files: Vec<&String> = workspace
        .keys()
        .filter(|p| is_ui_source_file(p) && under_root(p, root))
        .collect();
    files.sort();
    files
}

static MOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(createRoot\s*\([\s\S]*?\)\s*\.\s*render\s*\(|ReactDOM\.render\s*\()").unwrap()
});
static ROUTER_IMPORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"from\s+['"]react-router(-dom)?['"]"#).unwrap());
static IMPORT_STATEMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bimport\b").unwrap());
static DEFAULT_EXPORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export\s+default\b").unwrap());

/// Entry-detection score for one file's content (spec.md §4.6 "Entry
/// detection"): additive bonuses for mount/router/import evidence, a
/// penalty for a bare default export with no mount call.
pub fn entry_score(content: &str) -> i32 {
    let mut score = 0;
    let has_mount = MOUNT_PATTERN.is_match(content);
    if has_mount {
        score += 120;
    }
    if content.contains("getElementById") && content.contains("render") {
        score += 40;
    }
    if ROUTER_IMPORT_PATTERN.is_match(content) {
        score += 20;
    }
    if IMPORT_STATEMENT_PATTERN.is_match(content) {
        score += 10;
    }
    if DEFAULT_EXPORT_PATTERN.is_match(content) && !has_mount {
        score -= 30;
    }
    score
}

/// Highest-scoring UI file under `root` with a positive score is the
/// runtime entry (spec.md §4.6).
pub fn detect_entry(workspace: &WorkspaceSnapshot, root: &str) -> Option<String> {
    scoped_ui_files(workspace, root)
        .into_iter()
        .filter_map(|path| {
            let content = workspace.get(path)?;
            let score = entry_score(content);
            (score > 0).then_some((score, path.clone()))
        })
        .max_by(|(a, pa), (b, pb)| a.cmp(b).then_with(|| pb.cmp(pa)))
        .map(|(_, path)| path)
}

/// How an import specifier should be resolved against the workspace.
/// Plain package names (`react`, `lodash/debounce`) are external and never
/// checked — only the forms spec.md §4.6 enumerates are workspace-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    Relative,
    ViteAlias,
    WorkspaceAbsolute,
    ScopedAlias,
    External,
}

static SCOPED_PACKAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@[^/]+/").unwrap());

pub fn classify_specifier(specifier: &str) -> SpecifierKind {
    if specifier.starts_with('.') {
        SpecifierKind::Relative
    } else if specifier.starts_with("@/") {
        SpecifierKind::ViteAlias
    } else if specifier.starts_with("src/") {
        SpecifierKind::WorkspaceAbsolute
    } else if SCOPED_PACKAGE_PATTERN.is_match(specifier) {
        SpecifierKind::ScopedAlias
    } else {
        SpecifierKind::External
    }
}

fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

fn join(base: &str, rel: &str) -> String {
    let mut segments: Vec<&str> = if base.is_empty() {
        Vec::new()
    } else {
        base.split('/').collect()
    };
    for seg in rel.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Try `base`, `base.{ext}`, `base/index.{ext}` against the workspace
/// (spec.md §4.6 "Unresolved imports").
fn resolve_candidates(workspace: &WorkspaceSnapshot, base: &str) -> Option<String> {
    if workspace.contains_key(base) {
        return Some(base.to_string());
    }
    for ext in RESOLVE_EXTENSIONS {
        let with_ext = format!("{base}.{ext}");
        if workspace.contains_key(&with_ext) {
            return Some(with_ext);
        }
        let index = format!("{base}/index.{ext}");
        if workspace.contains_key(&index) {
            return Some(index);
        }
    }
    None
}

/// Whether any `vite.config.*` in the workspace declares a `@` alias
/// (spec.md §4.6: "`@/` aliases additionally require a matching
/// `vite.config.*` alias declaration").
pub fn vite_alias_declared(workspace: &WorkspaceSnapshot) -> bool {
    workspace.iter().any(|(path, content)| {
        path.rsplit('/').next().unwrap_or(path).starts_with("vite.config.")
            && (content.contains("'@'") || content.contains("\"@\""))
    })
}

/// ESM package (`"type": "module"`) using `__dirname` to build its `@`
/// alias — flagged as broken because `__dirname` is unavailable under ESM
/// (spec.md §4.6).
pub fn esm_dirname_alias_is_broken(workspace: &WorkspaceSnapshot) -> bool {
    let is_esm = workspace.iter().any(|(path, content)| {
        path.ends_with("package.json")
            && (content.contains(r#""type": "module""#) || content.contains(r#""type":"module""#))
    });
    if !is_esm {
        return false;
    }
    workspace.iter().any(|(path, content)| {
        path.rsplit('/').next().unwrap_or(path).starts_with("vite.config.") && content.contains("__dirname")
    })
}

/// Resolve an import specifier written inside `from_file` against the
/// workspace. Returns `None` for external packages (nothing to resolve)
/// and `Some(None)` is never produced — callers distinguish "unresolved"
/// from "external" via `classify_specifier`.
pub fn resolve_specifier(from_file: &str, specifier: &str, workspace: &WorkspaceSnapshot, root: &str) -> Option<Option<String>> {
    match classify_specifier(specifier) {
        SpecifierKind::External => None,
        SpecifierKind::Relative => {
            let base = join(&dirname(from_file), specifier);
            Some(resolve_candidates(workspace, &base))
        }
        SpecifierKind::ViteAlias => {
            if !vite_alias_declared(workspace) || esm_dirname_alias_is_broken(workspace) {
                return Some(None);
            }
            let rest = specifier.trim_start_matches("@/");
            let base = if root.is_empty() {
                format!("src/{rest}")
            } else {
                format!("{root}/src/{rest}")
            };
            Some(resolve_candidates(workspace, &base))
        }
        SpecifierKind::WorkspaceAbsolute => {
            let base = if root.is_empty() {
                specifier.to_string()
            } else {
                format!("{root}/{specifier}")
            };
            Some(resolve_candidates(workspace, &base))
        }
        SpecifierKind::ScopedAlias => {
            let rest = specifier.splitn(2, '/').nth(1).unwrap_or("");
            let base = if root.is_empty() {
                format!("src/{rest}")
            } else {
                format!("{root}/src/{rest}")
            };
            Some(resolve_candidates(workspace, &base))
        }
    }
}

static IMPORT_SPECIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:import\s+(?:[\s\S]*?\s+from\s+)?|export\s+(?:[\s\S]*?\s+from\s+)?|require\(\s*|import\(\s*)['"]([^'"]+)['"]"#).unwrap()
});

/// Every import specifier a file references, in source order.
pub fn extract_imports(content: &str) -> Vec<String> {
    IMPORT_SPECIFIER_PATTERN
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

/// Follow imports transitively from `entry`, resolving relative/alias
/// specifiers against the workspace (spec.md §4.6 "Reachability").
pub fn reachable_files(entry: &str, workspace: &WorkspaceSnapshot, root: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(entry.to_string());
    queue.push_back(entry.to_string());

    while let Some(path) = queue.pop_front() {
        let Some(content) = workspace.get(&path) else {
            continue;
        };
        for specifier in extract_imports(content) {
            if let Some(Some(resolved)) = resolve_specifier(&path, &specifier, workspace, root) {
                if seen.insert(resolved.clone()) {
                    queue.push_back(resolved);
                }
            }
        }
    }
    seen
}
