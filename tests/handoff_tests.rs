//! Tests for sub-agent delegation.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;

use botloop::agent_loop::{
    AgentRunParams, HandoffTool, RunContext, SubAgent, ToolLoopAgentRunner,
};
use botloop::error::BotloopError;
use botloop::provider::{LlmResponseStream, Provider};
use botloop::tools::{empty_parameters, FunctionTool, ToolCallResult, ToolSet};
use botloop::types::{LlmResponse, ProviderRequest, Role};

use common::{MockProvider, FINAL_ANSWER};

/// Provider scripted to request one named tool, then answer normally.
struct ScriptedToolProvider {
    tool_name: String,
    args: serde_json::Value,
    always_call_tools: bool,
    call_count: AtomicUsize,
}

impl ScriptedToolProvider {
    fn new(tool_name: &str, args: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            args,
            always_call_tools: false,
            call_count: AtomicUsize::new(0),
        }
    }

    fn relentless(tool_name: &str, args: serde_json::Value) -> Self {
        Self {
            always_call_tools: true,
            ..Self::new(tool_name, args)
        }
    }

    fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedToolProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "test_model"
    }

    async fn chat(&self, request: &ProviderRequest) -> Result<LlmResponse, BotloopError> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if request.tool_set.is_none() || (!self.always_call_tools && count > 1) {
            return Ok(LlmResponse::assistant(FINAL_ANSWER));
        }
        Ok(LlmResponse::assistant("").with_tool_call(
            self.tool_name.clone(),
            self.args.clone(),
            format!("call_{count}"),
        ))
    }

    async fn chat_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<LlmResponseStream, BotloopError> {
        let response = self.chat(request).await?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(response)])))
    }
}

/// Ambient session state shared between parent and delegate runs.
#[derive(Default)]
struct Counter(AtomicUsize);

/// Tool that mutates the ambient state through the run context.
struct CountTool {
    parameters: serde_json::Value,
}

impl CountTool {
    fn new() -> Self {
        Self {
            parameters: empty_parameters(),
        }
    }
}

#[async_trait]
impl FunctionTool for CountTool {
    fn name(&self) -> &str {
        "count"
    }

    fn description(&self) -> &str {
        "increments the session counter"
    }

    fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }

    async fn call(
        &self,
        ctx: &mut RunContext,
        _args: serde_json::Value,
    ) -> Result<ToolCallResult, BotloopError> {
        let counter = ctx
            .state::<Counter>()
            .ok_or_else(|| BotloopError::InvalidState("missing counter state".into()))?;
        counter.0.fetch_add(1, Ordering::SeqCst);
        Ok(ToolCallResult::text("counted"))
    }
}

#[test]
fn handoff_tool_is_named_from_the_delegate_identity() {
    let delegate = SubAgent::new("translator").with_instructions("You translate text.");
    let tool = HandoffTool::new(delegate, Arc::new(MockProvider::answering()));

    assert_eq!(tool.name(), "transfer_to_translator");
    assert!(tool.description().contains("translator"));
    let schema = tool.parameters();
    assert_eq!(schema["properties"]["input"]["type"], "string");
    assert_eq!(schema["properties"]["background_task"]["type"], "boolean");
}

#[tokio::test]
async fn handoff_returns_the_delegates_final_text() {
    let delegate_provider = Arc::new(MockProvider::answering());
    let tool = HandoffTool::new(SubAgent::new("helper"), delegate_provider.clone());

    let mut ctx = RunContext::default();
    let result = tool
        .call(
            &mut ctx,
            serde_json::json!({"input": "please summarize", "background_task": false}),
        )
        .await
        .expect("handoff result");

    assert_eq!(result.content, FINAL_ANSWER);
    assert!(!result.is_error);
    assert_eq!(delegate_provider.calls(), 1);
    assert!(
        ctx.messages().is_empty(),
        "the delegate's log must never leak into the parent context"
    );
}

#[tokio::test]
async fn handoff_requires_an_input_argument() {
    let tool = HandoffTool::new(
        SubAgent::new("helper"),
        Arc::new(MockProvider::answering()),
    );

    let mut ctx = RunContext::default();
    let err = tool
        .call(&mut ctx, serde_json::json!({"background_task": true}))
        .await
        .expect_err("missing input must be rejected");
    assert!(matches!(err, BotloopError::InvalidArgument(_)));
}

#[tokio::test]
async fn parent_loop_records_the_delegates_answer_as_a_tool_result() {
    let parent_provider = Arc::new(ScriptedToolProvider::new(
        "transfer_to_helper",
        serde_json::json!({"input": "look this up"}),
    ));
    let delegate_provider = Arc::new(MockProvider::answering());

    let handoff: Arc<dyn FunctionTool> = Arc::new(HandoffTool::new(
        SubAgent::new("helper").with_instructions("You are a research assistant."),
        delegate_provider.clone(),
    ));
    let request = ProviderRequest::new("find the answer", "test:session:1")
        .with_tool_set(ToolSet::new(vec![handoff]));

    let mut runner = ToolLoopAgentRunner::new();
    runner.reset(AgentRunParams::new(parent_provider.clone(), request));

    {
        let events = runner.step_until_done(5);
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            event.expect("event");
        }
    }

    assert!(runner.done());
    assert_eq!(parent_provider.calls(), 2);
    assert_eq!(delegate_provider.calls(), 1);

    let messages = runner.run_context().expect("run context").messages().to_vec();
    let tool_result = messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool result message");
    assert_eq!(tool_result.content, FINAL_ANSWER);
}

#[tokio::test]
async fn delegate_shares_the_parents_ambient_state() {
    let delegate_provider = Arc::new(ScriptedToolProvider::new(
        "count",
        serde_json::json!({}),
    ));
    let count_tool: Arc<dyn FunctionTool> = Arc::new(CountTool::new());
    let handoff = HandoffTool::new(
        SubAgent::new("counter").with_tool_set(ToolSet::new(vec![count_tool])),
        delegate_provider,
    );

    let mut parent_ctx = RunContext::new(Counter::default());
    handoff
        .call(&mut parent_ctx, serde_json::json!({"input": "count once"}))
        .await
        .expect("handoff result");

    let counter = parent_ctx.state::<Counter>().expect("counter state");
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delegate_runs_under_its_own_step_budget() {
    // A delegate that never stops calling tools still terminates through
    // the nested budget's forced final call.
    let delegate_provider = Arc::new(ScriptedToolProvider::relentless(
        "count",
        serde_json::json!({}),
    ));
    let count_tool: Arc<dyn FunctionTool> = Arc::new(CountTool::new());
    let handoff = HandoffTool::new(
        SubAgent::new("counter").with_tool_set(ToolSet::new(vec![count_tool])),
        delegate_provider.clone(),
    )
    .with_max_steps(2);

    let mut parent_ctx = RunContext::new(Counter::default());
    let result = handoff
        .call(&mut parent_ctx, serde_json::json!({"input": "loop forever"}))
        .await
        .expect("handoff result");

    assert_eq!(result.content, FINAL_ANSWER);
    assert_eq!(delegate_provider.calls(), 2);
}
