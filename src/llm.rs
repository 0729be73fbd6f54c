//! External collaborator traits (spec.md §6).
//!
//! Everything in this module is a contract the core *consumes*; concrete
//! implementations (the LLM adapter, tool registry, file storage, prompt
//! builder) live outside this crate (spec.md §1). No teacher equivalent —
//! the teacher owns its own concrete `rig-core` adapter (`crates/swarm-agents`),
//! which this spec deliberately excludes.

use async_trait::async_trait;

use crate::session::ExecutionContext;
use crate::tools::{ToolDefinition, WorkspaceSnapshot};

/// A single tool call requested by the model during one turn.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Why the LLM stopped producing tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Error,
}

/// Token accounting the adapter reports back, surfaced for observability
/// only — the core does not budget on it (spec.md §4.4 only budgets
/// iterations/duration/tool calls/score).
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One LLM turn's result (spec.md §6, `complete(request, toolExecutor)`).
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// A single LLM request: the assembled system prompt, the user turn, and
/// the whitelisted tool definitions available this attempt.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub tools: Vec<ToolDefinition>,
}

/// Result of executing one tool call — the `toolExecutor` callback the
/// orchestrator supplies to the adapter (spec.md §6).
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

/// Hook invoked by the adapter before every tool dispatch so budget gating
/// can veto the call (spec.md §4.2 step 6, §6).
#[async_trait]
pub trait BudgetGate: Send + Sync {
    async fn before_tool_call(&self, tool_name: &str) -> Result<(), String>;
}

/// The LLM adapter collaborator (spec.md §6). Implementations must honor
/// cancellation and call the supplied `BudgetGate` before each tool
/// dispatch.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
        budget_gate: &dyn BudgetGate,
    ) -> Result<CompletionResult, String>;
}

/// Executes a single tool call against the live workspace (spec.md §6).
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, args: serde_json::Value) -> ToolResult;
}

/// `getAllFiles(sessionId) -> [{path, content}]` (spec.md §6), used only
/// for diff-based intent capture.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn get_all_files(&self, session_id: &str) -> WorkspaceSnapshot;
}

/// `buildPrompt(execCtx) -> systemPrompt` per agent (spec.md §6); no
/// further introspection into prompt content (out of scope per spec.md §1).
pub trait PromptBuilder: Send + Sync {
    fn build_prompt(&self, ctx: &ExecutionContext) -> String;
}
