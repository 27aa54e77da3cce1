//! Tool execution seam.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::agent_loop::RunContext;
use crate::error::BotloopError;

use super::tool::FunctionTool;

/// One result fragment produced by a tool execution.
///
/// Executions may stream several fragments; the last one is the
/// authoritative result recorded in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallResult {
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Stream of result fragments from one tool invocation.
pub type ToolResultStream<'a> = BoxStream<'a, Result<ToolCallResult, BotloopError>>;

/// Invokes a requested tool against shared run state.
///
/// The seam between the agent loop and the tool registry: implementations
/// may wrap invocation with timeouts, sandboxing or progress reporting, and
/// may yield multiple fragments per call.
pub trait ToolExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        tool: Arc<dyn FunctionTool>,
        ctx: &'a mut RunContext,
        args: serde_json::Value,
    ) -> ToolResultStream<'a>;
}

/// Default executor: drives the tool's own handler and yields its single
/// result as one fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionToolExecutor;

impl ToolExecutor for FunctionToolExecutor {
    fn execute<'a>(
        &'a self,
        tool: Arc<dyn FunctionTool>,
        ctx: &'a mut RunContext,
        args: serde_json::Value,
    ) -> ToolResultStream<'a> {
        Box::pin(async_stream::try_stream! {
            let result = tool.call(ctx, args).await?;
            yield result;
        })
    }
}
