//! Configuration (SPEC_FULL.md §A.3).
//!
//! Grounded on the teacher's `harness::types::HarnessConfig::from_env()`
//! pattern: read an env var, parse, clamp, fall back to a default.

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const MIN_TIMEOUT_MS: u64 = 30_000;
const MAX_TIMEOUT_MS: u64 = 300_000;

/// The default per-attempt agent timeout (spec.md §6), overridable via
/// `EXECUTION_AGENT_TIMEOUT_MS` and clamped to `[30s, 300s]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionAgentConfig {
    pub default_timeout_ms: u64,
}

impl ExecutionAgentConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("EXECUTION_AGENT_TIMEOUT_MS") {
            if let Ok(parsed) = raw.parse::<u64>() {
                config.default_timeout_ms = parsed.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS);
            } else {
                tracing::warn!(value = %raw, "ignoring unparsable EXECUTION_AGENT_TIMEOUT_MS");
            }
        }
        config
    }
}

impl Default for ExecutionAgentConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}
