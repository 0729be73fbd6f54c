//! Per-task attempt state machine (spec.md §4.2).
//!
//! Grounded on the teacher's `crates/swarm-agents/src/state_machine.rs`
//! (`OrchestratorState` + `is_legal_transition` + a transition log), adapted
//! from the teacher's issue-level state graph to the nine-step single-task
//! attempt pipeline spec.md §4.2 enumerates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a single task attempt (spec.md §4.2 steps 1-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    PreFlight,
    PromptAssembly,
    ToolWhitelistSelection,
    TimeoutDerivation,
    FilesystemSnapshot,
    LlmToolLoop,
    DiffCollection,
    PolicyChecks,
    Published,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Published | AttemptState::Failed)
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttemptState::PreFlight => "pre_flight",
            AttemptState::PromptAssembly => "prompt_assembly",
            AttemptState::ToolWhitelistSelection => "tool_whitelist_selection",
            AttemptState::TimeoutDerivation => "timeout_derivation",
            AttemptState::FilesystemSnapshot => "filesystem_snapshot",
            AttemptState::LlmToolLoop => "llm_tool_loop",
            AttemptState::DiffCollection => "diff_collection",
            AttemptState::PolicyChecks => "policy_checks",
            AttemptState::Published => "published",
            AttemptState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

fn is_legal_transition(from: AttemptState, to: AttemptState) -> bool {
    use AttemptState::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (PreFlight, PromptAssembly)
            | (PromptAssembly, ToolWhitelistSelection)
            | (ToolWhitelistSelection, TimeoutDerivation)
            | (TimeoutDerivation, FilesystemSnapshot)
            | (FilesystemSnapshot, LlmToolLoop)
            | (LlmToolLoop, DiffCollection)
            | (DiffCollection, PolicyChecks)
            | (PolicyChecks, Published)
            // Policy checks may loop back to pre-flight for another attempt.
            | (PolicyChecks, PreFlight)
    )
}

#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: AttemptState,
    pub to: AttemptState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal attempt transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Tracks the current step of one task's attempt loop and the transitions
/// taken to get there, for diagnostics and for the `agent.task.progress`
/// event stream (spec.md §4.7).
#[derive(Debug)]
pub struct AttemptStateMachine {
    current: AttemptState,
    attempt: u32,
    history: Vec<(AttemptState, AttemptState)>,
}

impl AttemptStateMachine {
    pub fn new() -> Self {
        Self {
            current: AttemptState::PreFlight,
            attempt: 1,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> AttemptState {
        self.current
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn advance(&mut self, to: AttemptState) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }
        if self.current == AttemptState::PolicyChecks && to == AttemptState::PreFlight {
            self.attempt += 1;
        }
        self.history.push((self.current, to));
        self.current = to;
        Ok(())
    }

    pub fn history(&self) -> &[(AttemptState, AttemptState)] {
        &self.history
    }
}

impl Default for AttemptStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_published() {
        let mut sm = AttemptStateMachine::new();
        for next in [
            AttemptState::PromptAssembly,
            AttemptState::ToolWhitelistSelection,
            AttemptState::TimeoutDerivation,
            AttemptState::FilesystemSnapshot,
            AttemptState::LlmToolLoop,
            AttemptState::DiffCollection,
            AttemptState::PolicyChecks,
            AttemptState::Published,
        ] {
            sm.advance(next).unwrap();
        }
        assert_eq!(sm.current(), AttemptState::Published);
        assert!(sm.current().is_terminal());
    }

    #[test]
    fn retry_loop_increments_attempt() {
        let mut sm = AttemptStateMachine::new();
        for next in [
            AttemptState::PromptAssembly,
            AttemptState::ToolWhitelistSelection,
            AttemptState::TimeoutDerivation,
            AttemptState::FilesystemSnapshot,
            AttemptState::LlmToolLoop,
            AttemptState::DiffCollection,
            AttemptState::PolicyChecks,
        ] {
            sm.advance(next).unwrap();
        }
        assert_eq!(sm.attempt(), 1);
        sm.advance(AttemptState::PreFlight).unwrap();
        assert_eq!(sm.attempt(), 2);
    }

    #[test]
    fn illegal_skip_rejected() {
        let mut sm = AttemptStateMachine::new();
        let err = sm.advance(AttemptState::LlmToolLoop).unwrap_err();
        assert_eq!(err.from, AttemptState::PreFlight);
    }

    #[test]
    fn fail_allowed_from_any_non_terminal() {
        let mut sm = AttemptStateMachine::new();
        sm.advance(AttemptState::Failed).unwrap();
        assert!(sm.current().is_terminal());
    }
}
