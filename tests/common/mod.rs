//! Shared test doubles: scripted providers, executors and hooks.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use botloop::agent_loop::{AgentRunHooks, RunContext};
use botloop::error::BotloopError;
use botloop::provider::{LlmResponseStream, Provider};
use botloop::tools::{
    empty_parameters, ClosureTool, FunctionTool, ToolCallResult, ToolExecutor, ToolResultStream,
    ToolSet,
};
use botloop::types::{LlmResponse, ProviderRequest, TokenUsage};

pub const FINAL_ANSWER: &str = "这是我的最终回答";
pub const TOOL_OUTPUT: &str = "工具执行结果";

/// Scripted provider: requests `test_tool` until its tool set disappears or
/// a call-count threshold passes, then answers normally.
pub struct MockProvider {
    pub call_count: AtomicUsize,
    pub should_call_tools: bool,
    pub max_calls_before_normal_response: usize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            call_count: AtomicUsize::new(0),
            should_call_tools: true,
            max_calls_before_normal_response: 10,
        }
    }

    pub fn with_tools_until(calls: usize) -> Self {
        Self {
            max_calls_before_normal_response: calls,
            ..Self::new()
        }
    }

    pub fn answering() -> Self {
        Self {
            should_call_tools: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &ProviderRequest) -> LlmResponse {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;

        if request.tool_set.is_none()
            || count > self.max_calls_before_normal_response
            || !self.should_call_tools
        {
            return LlmResponse::assistant(FINAL_ANSWER).with_usage(TokenUsage::new(10, 5));
        }

        LlmResponse::assistant("我需要使用工具来帮助您")
            .with_tool_call("test_tool", serde_json::json!({"query": "test"}), "call_123")
            .with_usage(TokenUsage::new(10, 5))
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "test_model"
    }

    async fn chat(&self, request: &ProviderRequest) -> Result<LlmResponse, BotloopError> {
        Ok(self.respond(request))
    }

    async fn chat_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<LlmResponseStream, BotloopError> {
        let response = self.respond(request);
        let mut chunk = response.clone();
        chunk.is_chunk = true;
        Ok(Box::pin(futures::stream::iter(vec![Ok(chunk), Ok(response)])))
    }
}

/// Provider whose every call fails with a transport-level error.
pub struct FailingProvider {
    pub call_count: AtomicUsize,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self {
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for FailingProvider {
    fn id(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "test_model"
    }

    async fn chat(&self, _request: &ProviderRequest) -> Result<LlmResponse, BotloopError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Err(BotloopError::api(500, "primary provider failed"))
    }

    async fn chat_stream(
        &self,
        _request: &ProviderRequest,
    ) -> Result<LlmResponseStream, BotloopError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Err(BotloopError::api(500, "primary provider failed"))
    }
}

/// Provider that answers with an error-flagged response.
pub struct ErrProvider {
    pub call_count: AtomicUsize,
}

impl ErrProvider {
    pub fn new() -> Self {
        Self {
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ErrProvider {
    fn id(&self) -> &str {
        "err"
    }

    fn model(&self) -> &str {
        "test_model"
    }

    async fn chat(&self, _request: &ProviderRequest) -> Result<LlmResponse, BotloopError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(LlmResponse::err("primary provider returned error"))
    }

    async fn chat_stream(
        &self,
        _request: &ProviderRequest,
    ) -> Result<LlmResponseStream, BotloopError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(futures::stream::iter(vec![Ok(
            LlmResponse::err("primary provider returned error"),
        )])))
    }
}

/// Streaming provider that yields one "partial " chunk, then a terminal
/// response — giving the consumer a window to request a stop in between.
pub struct AbortableStreamProvider;

#[async_trait]
impl Provider for AbortableStreamProvider {
    fn id(&self) -> &str {
        "abortable"
    }

    fn model(&self) -> &str {
        "test_model"
    }

    async fn chat(&self, _request: &ProviderRequest) -> Result<LlmResponse, BotloopError> {
        Ok(LlmResponse::assistant("partial final"))
    }

    async fn chat_stream(
        &self,
        _request: &ProviderRequest,
    ) -> Result<LlmResponseStream, BotloopError> {
        Ok(Box::pin(futures::stream::iter(vec![
            Ok(LlmResponse::chunk("partial ")),
            Ok(LlmResponse::assistant("partial final")),
        ])))
    }
}

/// Provider returning misaligned tool-call lists (a contract violation).
pub struct MalformedProvider;

#[async_trait]
impl Provider for MalformedProvider {
    fn id(&self) -> &str {
        "malformed"
    }

    fn model(&self) -> &str {
        "test_model"
    }

    async fn chat(&self, _request: &ProviderRequest) -> Result<LlmResponse, BotloopError> {
        let mut response = LlmResponse::assistant("");
        response.tools_call_name = vec!["test_tool".into()];
        response.tools_call_args = vec![serde_json::json!({}), serde_json::json!({})];
        response.tools_call_ids = vec!["call_1".into()];
        Ok(response)
    }

    async fn chat_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<LlmResponseStream, BotloopError> {
        let response = self.chat(request).await?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(response)])))
    }
}

/// Executor that ignores the tool handler and yields one canned fragment.
pub struct MockToolExecutor;

impl ToolExecutor for MockToolExecutor {
    fn execute<'a>(
        &'a self,
        _tool: Arc<dyn FunctionTool>,
        _ctx: &'a mut RunContext,
        _args: serde_json::Value,
    ) -> ToolResultStream<'a> {
        Box::pin(futures::stream::iter(vec![Ok(ToolCallResult::text(
            TOOL_OUTPUT,
        ))]))
    }
}

/// Executor yielding progress fragments before the final result.
pub struct ProgressToolExecutor;

impl ToolExecutor for ProgressToolExecutor {
    fn execute<'a>(
        &'a self,
        _tool: Arc<dyn FunctionTool>,
        _ctx: &'a mut RunContext,
        _args: serde_json::Value,
    ) -> ToolResultStream<'a> {
        Box::pin(futures::stream::iter(vec![
            Ok(ToolCallResult::text("working...")),
            Ok(ToolCallResult::text(TOOL_OUTPUT)),
        ]))
    }
}

/// Executor whose execution fails mid-stream.
pub struct FailingToolExecutor;

impl ToolExecutor for FailingToolExecutor {
    fn execute<'a>(
        &'a self,
        tool: Arc<dyn FunctionTool>,
        _ctx: &'a mut RunContext,
        _args: serde_json::Value,
    ) -> ToolResultStream<'a> {
        let name = tool.name().to_string();
        Box::pin(futures::stream::iter(vec![Err(BotloopError::tool(
            name,
            "tool handler blew up",
        ))]))
    }
}

/// Hooks that count their invocations.
#[derive(Default)]
pub struct RecordingHooks {
    pub agent_begin: AtomicUsize,
    pub agent_done: AtomicUsize,
    pub tool_start: AtomicUsize,
    pub tool_end: AtomicUsize,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRunHooks for RecordingHooks {
    async fn on_agent_begin(&self, _ctx: &mut RunContext) {
        self.agent_begin.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_tool_start(
        &self,
        _ctx: &mut RunContext,
        _tool: &dyn FunctionTool,
        _args: &serde_json::Value,
    ) {
        self.tool_start.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_tool_end(
        &self,
        _ctx: &mut RunContext,
        _tool: &dyn FunctionTool,
        _args: &serde_json::Value,
        _result: &ToolCallResult,
    ) {
        self.tool_end.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_agent_done(&self, _ctx: &mut RunContext, _response: &LlmResponse) {
        self.agent_done.fetch_add(1, Ordering::SeqCst);
    }
}

/// The tool set the scripted providers ask for.
pub fn test_tool_set() -> ToolSet {
    let tool: Arc<dyn FunctionTool> = Arc::new(ClosureTool::new(
        "test_tool",
        "测试工具",
        serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
        }),
        |_args| async { Ok(ToolCallResult::text(TOOL_OUTPUT)) },
    ));
    ToolSet::new(vec![tool])
}

/// A trivial no-parameter tool.
pub fn noop_tool(name: &str) -> Arc<dyn FunctionTool> {
    Arc::new(ClosureTool::new(
        name,
        "does nothing",
        empty_parameters(),
        |_args| async { Ok(ToolCallResult::text("ok")) },
    ))
}

/// A request in the shape the upstream pipeline builds.
pub fn test_request() -> ProviderRequest {
    ProviderRequest::new("请帮我查询信息", "test:session:1").with_tool_set(test_tool_set())
}
