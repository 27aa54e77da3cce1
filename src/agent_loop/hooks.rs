//! Lifecycle observer for agent runs.

use async_trait::async_trait;

use crate::tools::{FunctionTool, ToolCallResult};
use crate::types::LlmResponse;

use super::run_context::RunContext;

/// Extension points invoked by the runner.
///
/// All methods default to no-ops. Firing discipline: `on_agent_begin` once
/// per run; `on_tool_start`/`on_tool_end` once per executed tool invocation
/// (before and after execution); `on_agent_done` once per run regardless of
/// how it terminated, with whatever final response exists — on abort that
/// is the response synthesized from the partial text.
#[async_trait]
pub trait AgentRunHooks: Send + Sync {
    async fn on_agent_begin(&self, _ctx: &mut RunContext) {}

    async fn on_tool_start(
        &self,
        _ctx: &mut RunContext,
        _tool: &dyn FunctionTool,
        _args: &serde_json::Value,
    ) {
    }

    async fn on_tool_end(
        &self,
        _ctx: &mut RunContext,
        _tool: &dyn FunctionTool,
        _args: &serde_json::Value,
        _result: &ToolCallResult,
    ) {
    }

    async fn on_agent_done(&self, _ctx: &mut RunContext, _response: &LlmResponse) {}
}

/// Hooks implementation that observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAgentRunHooks;

#[async_trait]
impl AgentRunHooks for NoopAgentRunHooks {}
