//! Retry and timeout policy for the Task Runner (spec.md §4.2 steps 4 & 8).
//!
//! Grounded on the teacher's `feedback/error_parser.rs` idiom of a small set
//! of `LazyLock<Regex>` classifiers, adapted here from "rustc diagnostic
//! categories" to "transient transport failure signatures".

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::plan::AgentId;

static TRANSIENT_TRANSPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(ECONNRESET|ETIMEDOUT|ECONNREFUSED|ENOTFOUND|EAI_AGAIN|timed? ?out|http status 0|status: 0)")
        .unwrap()
});

/// `Transient network failure` classification (spec.md §4.2 step 8):
/// timeouts, connection resets, and HTTP status 0 are retryable.
pub fn is_transient_transport_error(message: &str) -> bool {
    TRANSIENT_TRANSPORT_PATTERN.is_match(message)
}

/// Base per-attempt timeout by agent (spec.md §4.2 step 4), before the
/// [30s, 300s] environment clamp and the retry cap are applied.
fn base_timeout(agent_id: AgentId, default_ms: u64) -> Duration {
    match agent_id {
        AgentId::Scaffold => Duration::from_secs(180),
        AgentId::Repair => Duration::from_secs(300),
        _ => Duration::from_millis(default_ms),
    }
}

/// Retry-attempt cap: 180s normally, 300s for the repair agent (spec.md
/// §4.2 step 4).
fn retry_cap(agent_id: AgentId) -> Duration {
    match agent_id {
        AgentId::Repair => Duration::from_secs(300),
        _ => Duration::from_secs(180),
    }
}

/// Derive the attempt timeout for `agent_id` at 1-indexed `attempt`,
/// clipped by `remaining_duration_budget` if the run has a duration limit.
/// `default_ms` is the configured default (`EXECUTION_AGENT_TIMEOUT_MS`,
/// already clamped to [30s, 300s] by `config::ExecutionAgentConfig`).
pub fn derive_attempt_timeout(
    agent_id: AgentId,
    attempt: u32,
    default_ms: u64,
    remaining_duration_budget: Option<Duration>,
) -> Duration {
    let mut timeout = base_timeout(agent_id, default_ms);
    if attempt >= 2 {
        timeout = std::cmp::min(timeout, retry_cap(agent_id));
    }
    if let Some(remaining) = remaining_duration_budget {
        timeout = std::cmp::min(timeout, remaining);
    }
    timeout
}

/// A hard timeout of `attemptTimeout + 5s` wraps the entire attempt
/// (spec.md §4.2 step 4, §5).
pub fn hard_timeout(attempt_timeout: Duration) -> Duration {
    attempt_timeout + Duration::from_secs(5)
}
