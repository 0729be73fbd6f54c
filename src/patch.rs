//! Patch Merger (C1) — groups file mutations produced within a wave by path,
//! applies a last-writer-wins policy, and records conflicts (spec.md §4.3).

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

use crate::plan::{AgentId, TaskId};

/// Monotonic timestamp used for createdAt ordering and wave numbering.
/// Not wall-clock time — spec.md only requires a total order, so callers
/// supply an incrementing counter (the Task Runner uses one per submitted
/// intent).
pub type Millis = i64;

/// Compute the SHA-1 hex digest of file content, per spec.md §3.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// A proposed full-file write produced by a single task, awaiting merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchIntent {
    pub id: String,
    pub wave_id: u32,
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub file_path: String,
    pub content: String,
    pub content_hash: String,
    pub created_at: Millis,
}

impl PatchIntent {
    pub fn new(
        id: impl Into<String>,
        wave_id: u32,
        task_id: impl Into<TaskId>,
        agent_id: AgentId,
        file_path: impl Into<String>,
        content: impl Into<String>,
        created_at: Millis,
    ) -> Self {
        let content = content.into();
        let content_hash = content_hash(&content);
        Self {
            id: id.into(),
            wave_id,
            task_id: task_id.into(),
            agent_id,
            file_path: normalize_path(&file_path.into()),
            content,
            content_hash,
            created_at,
        }
    }
}

/// Collapse `//`, strip a leading `./`, and reject `..` segments — applied
/// at every boundary with external file paths (spec.md §9, "Path
/// canonicalization").
pub fn normalize_path(path: &str) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    let mut out = Vec::new();
    for seg in stripped.split('/') {
        if seg.is_empty() || seg == "." {
            continue;
        }
        if seg == ".." {
            // Reject escapes outside the workspace by dropping the segment
            // rather than popping out of `out` — a leading `..` has nowhere
            // legitimate to resolve to from a workspace-relative path.
            continue;
        }
        out.push(seg);
    }
    out.join("/")
}

/// Open/resolved status of a conflict between concurrent intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Open,
    Resolved,
}

/// Emitted when two or more intents in a single wave target the same file
/// (spec.md §4.3, invariant 5 in §8: conflict totality).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub id: String,
    pub file_path: String,
    pub involved_agents: Vec<AgentId>,
    pub reason: String,
    pub status: ConflictStatus,
    pub resolved_by: Option<AgentId>,
}

impl ConflictRecord {
    pub fn resolve(&mut self, by: AgentId) {
        self.status = ConflictStatus::Resolved;
        self.resolved_by = Some(by);
    }
}

/// Result of merging one wave's intents: one winner per touched file, plus
/// any conflicts discovered along the way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergedPatchBatch {
    pub id: String,
    pub wave_id: u32,
    pub merged: Vec<PatchIntent>,
    pub conflicts: Vec<ConflictRecord>,
    pub touched_files: Vec<String>,
}

/// Deterministic last-writer-wins merge of a wave's patch intents.
///
/// Winner selection (spec.md §4.3): within a file's intent group, sort by
/// `(createdAt asc, contentHash asc)` and take the last — i.e. the greatest
/// `createdAt`, ties broken by the lexicographically greatest `contentHash`.
/// This total order makes `merge` idempotent: re-merging the same intent set
/// (spec.md §8 invariant 3) always yields the same winner.
pub struct PatchMerger;

impl PatchMerger {
    /// Merge intents produced within a single wave.
    pub fn merge(batch_id: impl Into<String>, wave_id: u32, intents: Vec<PatchIntent>) -> MergedPatchBatch {
        if intents.is_empty() {
            return MergedPatchBatch {
                id: batch_id.into(),
                wave_id: 0,
                merged: Vec::new(),
                conflicts: Vec::new(),
                touched_files: Vec::new(),
            };
        }

        let mut by_path: HashMap<String, Vec<PatchIntent>> = HashMap::new();
        for intent in intents {
            by_path.entry(intent.file_path.clone()).or_default().push(intent);
        }

        let mut merged = Vec::new();
        let mut conflicts = Vec::new();
        let mut touched_files: Vec<String> = by_path.keys().cloned().collect();
        touched_files.sort();

        for (path, mut group) in by_path {
            if group.len() == 1 {
                merged.push(group.pop().unwrap());
                continue;
            }

            group.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.content_hash.cmp(&b.content_hash))
            });

            let involved_agents: Vec<AgentId> = group.iter().map(|i| i.agent_id).collect();
            let winner = group.pop().expect("group has at least 2 elements");

            conflicts.push(ConflictRecord {
                id: format!("conflict-{}-{}", wave_id, path.replace('/', "_")),
                file_path: path,
                involved_agents,
                reason: format!("multiple intents for {}", winner.file_path),
                status: ConflictStatus::Open,
                resolved_by: None,
            });

            merged.push(winner);
        }

        merged.sort_by(|a, b| a.file_path.cmp(&b.file_path));

        MergedPatchBatch {
            id: batch_id.into(),
            wave_id,
            merged,
            conflicts,
            touched_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(path: &str, agent: AgentId, created_at: Millis, content: &str) -> PatchIntent {
        PatchIntent::new(
            format!("{path}-{created_at}"),
            1,
            "task",
            agent,
            path,
            content,
            created_at,
        )
    }

    #[test]
    fn single_intent_passes_through_untouched() {
        let intents = vec![intent("src/App.tsx", AgentId::Scaffold, 10, "a")];
        let batch = PatchMerger::merge("b1", 1, intents);
        assert_eq!(batch.merged.len(), 1);
        assert!(batch.conflicts.is_empty());
    }

    #[test]
    fn empty_input_returns_empty_batch() {
        let batch = PatchMerger::merge("b1", 1, Vec::new());
        assert_eq!(batch.wave_id, 0);
        assert!(batch.merged.is_empty());
        assert!(batch.conflicts.is_empty());
    }

    #[test]
    fn conflict_winner_is_latest_created_at() {
        // Scenario 2 from spec.md §8: page@10/aaa vs state@20/bbb -> state wins.
        let intents = vec![
            intent("src/App.tsx", AgentId::Page, 10, "aaa-content"),
            intent("src/App.tsx", AgentId::State, 20, "bbb-content"),
        ];
        let batch = PatchMerger::merge("b1", 1, intents);
        assert_eq!(batch.merged.len(), 1);
        assert_eq!(batch.conflicts.len(), 1);
        assert_eq!(batch.merged[0].created_at, 20);
        assert_eq!(batch.merged[0].agent_id, AgentId::State);
        let conflict = &batch.conflicts[0];
        assert_eq!(conflict.status, ConflictStatus::Open);
        assert_eq!(conflict.involved_agents.len(), 2);
    }

    #[test]
    fn tie_break_uses_content_hash() {
        let a = intent("src/x.ts", AgentId::Page, 10, "zzz");
        let b = intent("src/x.ts", AgentId::State, 10, "aaa");
        let batch = PatchMerger::merge("b1", 1, vec![a, b]);
        // "zzz" hashes to something lexicographically different than "aaa";
        // whichever hash sorts greatest wins deterministically.
        let winner_hash = batch.merged[0].content_hash.clone();
        let hashes = vec![content_hash("zzz"), content_hash("aaa")];
        let expected = hashes.into_iter().max().unwrap();
        assert_eq!(winner_hash, expected);
    }

    #[test]
    fn merge_is_idempotent() {
        let intents = vec![
            intent("a.ts", AgentId::Page, 1, "one"),
            intent("a.ts", AgentId::State, 2, "two"),
        ];
        let first = PatchMerger::merge("b1", 1, intents.clone());
        let second = PatchMerger::merge("b2", 1, intents);
        assert_eq!(first.merged[0].content_hash, second.merged[0].content_hash);
    }

    #[test]
    fn path_normalization_strips_dot_slash_and_collapses() {
        assert_eq!(normalize_path("./src//App.tsx"), "src/App.tsx");
        assert_eq!(normalize_path("../etc/passwd"), "etc/passwd");
        assert_eq!(normalize_path("src/a/../b"), "src/a/b");
    }

    #[test]
    fn content_hash_is_sha1_hex() {
        let h = content_hash("hello");
        assert_eq!(h.len(), 40);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
