//! CLI entry point (SPEC_FULL.md §B.3).
//!
//! Loads an `ExecutionPlan` + `RuntimeBudgetInput` from a JSON request file,
//! seeds an in-memory workspace from a directory on disk, drives the
//! `Orchestrator` to completion, and prints the `RunSummary` plus the full
//! JSON output. Mirrors the teacher's `main.rs`: `clap` argument parsing,
//! a `tracing_subscriber::fmt` subscriber gated by `RUST_LOG`, `anyhow`
//! at the binary boundary.
//!
//! No LLM adapter or concrete tool implementation ships with this crate
//! (spec.md §1's Non-goals) — the collaborators wired in here are
//! deliberately inert stand-ins that let a request run end to end through
//! scheduling, budgeting, merging, and the quality gate without ever
//! producing a real patch. A host embedding this crate supplies its own
//! `LlmAdapter`/`ToolExecutor`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use serde::Deserialize;

use exec_orchestration_core::{
    AgentId, BudgetGate, CompletionRequest, CompletionResult, ExecutionAgentConfig,
    ExecutionContext, ExecutionPlan, FileStorage, FinishReason, LlmAdapter, Orchestrator,
    PromptBuilder, RunInput, RunSummary, RuntimeBudgetInput, SessionDocument, ToolExecutor,
    ToolResult, Usage, WorkspaceSnapshot,
};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Execution Orchestration Core CLI", long_about = None)]
struct Args {
    /// Path to a JSON file describing the run request (session/run id,
    /// user message, plan, session documents, runtime budget).
    request: PathBuf,

    /// Directory whose files seed the in-memory workspace (optional; an
    /// empty workspace is used if omitted).
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Print the full JSON orchestrator output in addition to the summary.
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// On-disk shape of a run request; converted into `RunInput` after load.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    session_id: String,
    run_id: String,
    user_message: String,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    tech_stack: Vec<String>,
    #[serde(default)]
    session_documents: Vec<SessionDocument>,
    plan: ExecutionPlan,
    #[serde(default)]
    runtime_budget: Option<RuntimeBudgetInput>,
}

/// Recursively reads `dir` into a path→content workspace snapshot, with
/// paths relative to `dir` and normalized to forward slashes.
fn read_workspace(dir: &std::path::Path) -> Result<WorkspaceSnapshot> {
    let mut files = HashMap::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)
            .with_context(|| format!("reading directory {}", current.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let relative = path
                .strip_prefix(dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading file {}", path.display()))?;
            files.insert(relative, content);
        }
    }
    Ok(files)
}

/// A `FileStorage` backed by a fixed in-memory snapshot seeded at startup.
/// No tool executor in this binary ever mutates it; it exists so the
/// runner's diff-based intent capture (spec.md §4.2 step 7) has a baseline
/// to diff against.
struct InMemoryFileStorage {
    snapshot: Mutex<WorkspaceSnapshot>,
}

impl InMemoryFileStorage {
    fn new(snapshot: WorkspaceSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn get_all_files(&self, _session_id: &str) -> WorkspaceSnapshot {
        self.snapshot.lock().unwrap().clone()
    }
}

/// Inert `LlmAdapter`: reports an immediate stop with no tool calls. This
/// binary has no model to delegate to (spec.md §1's Non-goals exclude an
/// LLM adapter implementation); a real deployment supplies its own.
struct NoopLlmAdapter;

#[async_trait]
impl LlmAdapter for NoopLlmAdapter {
    async fn complete(
        &self,
        _request: CompletionRequest,
        _budget_gate: &dyn BudgetGate,
    ) -> Result<CompletionResult, String> {
        Ok(CompletionResult {
            text: "no LLM adapter configured".to_string(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        })
    }
}

/// Inert `ToolExecutor`: refuses every call. Concrete tool implementations
/// (file I/O, grep, bash) are out of scope for this crate (spec.md §1).
struct NoopToolExecutor;

#[async_trait]
impl ToolExecutor for NoopToolExecutor {
    async fn execute(&self, name: &str, _args: serde_json::Value) -> ToolResult {
        ToolResult {
            content: format!("tool '{name}' has no implementation in this binary"),
            is_error: true,
        }
    }
}

/// Builds a fixed system prompt per agent; this binary does not ship real
/// prompt content (spec.md §1's Non-goals).
struct StaticPromptBuilder;

impl PromptBuilder for StaticPromptBuilder {
    fn build_prompt(&self, ctx: &ExecutionContext) -> String {
        format!(
            "session {} run {}: {}",
            ctx.session_id, ctx.run_id, ctx.user_message
        )
    }
}

fn agent_label(agent_id: AgentId) -> &'static str {
    match agent_id {
        AgentId::Scaffold => "scaffold",
        AgentId::Page => "page",
        AgentId::State => "state",
        AgentId::Style => "style",
        AgentId::Interaction => "interaction",
        AgentId::Quality => "quality",
        AgentId::Repair => "repair",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("exec_orchestration_core=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw = std::fs::read_to_string(&args.request)
        .with_context(|| format!("reading request file {}", args.request.display()))?;
    let request: RunRequest =
        serde_json::from_str(&raw).context("parsing run request JSON")?;

    tracing::info!(
        session_id = %request.session_id,
        run_id = %request.run_id,
        tasks = request.plan.tasks.len(),
        "loaded run request"
    );
    for task in &request.plan.tasks {
        tracing::debug!(task_id = %task.id, agent = agent_label(task.agent_id), "task in plan");
    }

    let workspace = match &args.workspace {
        Some(dir) => read_workspace(dir)?,
        None => HashMap::new(),
    };

    let orchestrator = Orchestrator::new(
        Arc::new(NoopLlmAdapter),
        Arc::new(NoopToolExecutor),
        Arc::new(InMemoryFileStorage::new(workspace)),
        Arc::new(StaticPromptBuilder),
        ExecutionAgentConfig::from_env(),
    );

    let input = RunInput {
        session_id: request.session_id,
        run_id: request.run_id,
        user_message: request.user_message,
        platform: request.platform,
        tech_stack: request.tech_stack,
        session_documents: request.session_documents,
        plan: request.plan,
        runtime_budget: request.runtime_budget,
        abort_signal: None,
    };

    let output = orchestrator.run(input).await?;

    println!("{}", RunSummary(&output));
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    if output.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
