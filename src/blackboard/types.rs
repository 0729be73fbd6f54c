//! Types stored on the Blackboard (spec.md §3) that aren't already defined
//! by `plan`, `patch`, or `budget`.

use serde::{Deserialize, Serialize};

/// Name of a quality gate (currently only `"artifact-quality"`, but kept as
/// a string so future gates don't require a schema change).
pub type GateName = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pending,
    Passed,
    Failed,
}

/// The pass/fail decision after a quality-agent round (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityGateState {
    pub gate: GateName,
    pub status: GateStatus,
    pub summary: String,
}

impl QualityGateState {
    pub fn pending(gate: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Pending,
            summary: String::new(),
        }
    }

    pub fn passed(gate: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Passed,
            summary: summary.into(),
        }
    }

    pub fn failed(gate: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            status: GateStatus::Failed,
            summary: summary.into(),
        }
    }
}
