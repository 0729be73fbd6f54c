//! Tool Bridge (C4) — whitelist merge, JSON-Schema conversion for
//! LLM-visible tool definitions, and filesystem snapshotting (spec.md §4.2
//! step 3, §4.6, §6).
//!
//! No direct teacher precedent (the teacher's `tool_schema.rs` models a
//! different, reviewer-specific tool surface — see DESIGN.md); this module
//! follows the "declarative schema, falls back to `{type: object}` on
//! failure" contract spec.md §6 states for the tool registry collaborator.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};

use crate::plan::AgentId;

/// Tools that mutate the workspace. Used to narrow a retrying agent's
/// whitelist per spec.md §4.2 step 3.
const MUTATING_TOOLS: &[&str] = &["write", "apply_diff"];

/// `ToolDefinition` as handed to the LLM adapter: name, description, and a
/// JSON-Schema `parameters` object (spec.md §6's tool registry contract).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Declarative parameter schema a tool registry entry supplies; converted
/// to JSON-Schema by `to_json_schema`. Kept deliberately small: this core
/// only needs to pass whitelisted tool ids through to the LLM adapter, not
/// implement the tools themselves (spec.md §1).
#[derive(Debug, Clone, Default)]
pub struct ParameterSchema {
    pub properties: BTreeMap<String, &'static str>,
    pub required: Vec<&'static str>,
}

/// Convert a declarative parameter schema to JSON-Schema. Returns
/// `{"type": "object"}` on any conversion failure, matching the registry
/// contract in spec.md §6.
pub fn to_json_schema(schema: &ParameterSchema) -> Value {
    if schema.properties.is_empty() {
        return json!({ "type": "object" });
    }
    let properties: serde_json::Map<String, Value> = schema
        .properties
        .iter()
        .map(|(name, ty)| (name.clone(), json!({ "type": ty })))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": schema.required,
    })
}

/// Registry of known tool ids to their declarative schema. A real registry
/// lives outside this crate (spec.md §1); this default set only covers the
/// tool ids `plan::AgentId::default_tools` references, enough for the
/// bridge's merge/whitelist logic to be exercised without an external
/// collaborator.
pub fn default_registry() -> HashMap<&'static str, ParameterSchema> {
    let mut registry = HashMap::new();
    registry.insert(
        "read",
        ParameterSchema {
            properties: BTreeMap::from([("path", "string")]),
            required: vec!["path"],
        },
    );
    registry.insert(
        "grep",
        ParameterSchema {
            properties: BTreeMap::from([("pattern", "string"), ("path", "string")]),
            required: vec!["pattern"],
        },
    );
    registry.insert(
        "glob",
        ParameterSchema {
            properties: BTreeMap::from([("pattern", "string")]),
            required: vec!["pattern"],
        },
    );
    registry.insert(
        "write",
        ParameterSchema {
            properties: BTreeMap::from([("path", "string"), ("content", "string")]),
            required: vec!["path", "content"],
        },
    );
    registry.insert(
        "apply_diff",
        ParameterSchema {
            properties: BTreeMap::from([("path", "string"), ("diff", "string")]),
            required: vec!["path", "diff"],
        },
    );
    registry.insert(
        "bash",
        ParameterSchema {
            properties: BTreeMap::from([("command", "string")]),
            required: vec!["command"],
        },
    );
    registry
}

/// Merges agent defaults with task-declared tools and narrows on retry
/// (spec.md §4.2 step 3).
pub struct ToolBridge {
    registry: HashMap<&'static str, ParameterSchema>,
}

impl ToolBridge {
    pub fn new() -> Self {
        Self {
            registry: default_registry(),
        }
    }

    pub fn with_registry(registry: HashMap<&'static str, ParameterSchema>) -> Self {
        Self { registry }
    }

    /// `Merge the agent's default tools with the task's declared tools. If
    /// this is attempt >= 2 for a mutation-required agent outside the
    /// "preserve context on retry" set, narrow the whitelist to the
    /// mutating subset` (spec.md §4.2 step 3).
    pub fn select_whitelist(
        &self,
        agent_id: AgentId,
        declared_tools: &[String],
        attempt: u32,
    ) -> Vec<String> {
        let mut whitelist: Vec<String> = agent_id
            .default_tools()
            .iter()
            .map(|s| s.to_string())
            .collect();
        for tool in declared_tools {
            if !whitelist.contains(tool) {
                whitelist.push(tool.clone());
            }
        }

        let should_narrow =
            attempt >= 2 && agent_id.is_mutation_required() && !agent_id.preserves_context_on_retry();
        if should_narrow {
            whitelist.retain(|t| MUTATING_TOOLS.contains(&t.as_str()));
        }
        whitelist
    }

    /// Resolve whitelisted tool ids to LLM-visible `ToolDefinition`s.
    /// Unknown ids are silently dropped (the registry is external; a tool
    /// id with no matching registry entry cannot be offered to the model).
    pub fn resolve(&self, whitelist: &[String]) -> Vec<ToolDefinition> {
        whitelist
            .iter()
            .filter_map(|id| {
                let schema = self.registry.get(id.as_str())?;
                Some(ToolDefinition {
                    name: id.clone(),
                    description: format!("{id} tool"),
                    parameters: to_json_schema(schema),
                })
            })
            .collect()
    }
}

impl Default for ToolBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-memory `{path -> content}` view of the session workspace, taken
/// before and after a task attempt (spec.md §4.2 step 5, §9 "diff-based
/// mutation capture").
pub type WorkspaceSnapshot = HashMap<String, String>;

/// Diff two snapshots, returning every path whose content changed or was
/// newly added. Deletions are not modeled: spec.md's `PatchIntent` is a
/// full-file *write*, so a task that deletes a file produces no intent for
/// it (the file simply survives from the prior wave's merged content).
pub fn diff_snapshots(before: &WorkspaceSnapshot, after: &WorkspaceSnapshot) -> Vec<String> {
    let mut changed: Vec<String> = after
        .iter()
        .filter(|(path, content)| before.get(*path) != Some(content))
        .map(|(path, _)| path.clone())
        .collect();
    changed.sort();
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_merges_declared_and_default() {
        let bridge = ToolBridge::new();
        let wl = bridge.select_whitelist(AgentId::Scaffold, &["bash".to_string()], 1);
        assert!(wl.contains(&"read".to_string()));
        assert!(wl.contains(&"bash".to_string()));
    }

    #[test]
    fn retry_narrows_to_mutating_subset() {
        let bridge = ToolBridge::new();
        let wl = bridge.select_whitelist(AgentId::Page, &[], 2);
        assert!(wl.iter().all(|t| MUTATING_TOOLS.contains(&t.as_str())));
        assert!(wl.contains(&"write".to_string()));
    }

    #[test]
    fn repair_agent_preserves_context_on_retry() {
        let bridge = ToolBridge::new();
        let wl = bridge.select_whitelist(AgentId::Repair, &[], 3);
        assert!(wl.contains(&"read".to_string()));
    }

    #[test]
    fn quality_agent_never_narrows() {
        let bridge = ToolBridge::new();
        let wl = bridge.select_whitelist(AgentId::Quality, &[], 2);
        assert!(wl.contains(&"read".to_string()));
    }

    #[test]
    fn unknown_tool_id_dropped_on_resolve() {
        let bridge = ToolBridge::new();
        let defs = bridge.resolve(&["not-a-real-tool".to_string()]);
        assert!(defs.is_empty());
    }

    #[test]
    fn diff_detects_additions_and_modifications() {
        let before = HashMap::from([("a.ts".to_string(), "1".to_string())]);
        let after = HashMap::from([
            ("a.ts".to_string(), "2".to_string()),
            ("b.ts".to_string(), "new".to_string()),
        ]);
        let changed = diff_snapshots(&before, &after);
        assert_eq!(changed, vec!["a.ts".to_string(), "b.ts".to_string()]);
    }
}
