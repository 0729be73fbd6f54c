//! The Blackboard (C2): process-local shared state for one orchestration run.
//!
//! See `store::Blackboard` for the container itself and `types` for the
//! entities it holds that aren't already owned by `plan` or `patch`.

pub mod store;
pub mod types;

pub use store::{Blackboard, SharedBlackboard};
pub use types::{GateName, GateStatus, QualityGateState};
