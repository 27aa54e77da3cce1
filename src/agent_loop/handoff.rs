//! Sub-agent delegation tool.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::error::BotloopError;
use crate::provider::Provider;
use crate::tools::{FunctionTool, FunctionToolExecutor, ToolCallResult, ToolExecutor, ToolSet};
use crate::types::ProviderRequest;

use super::hooks::{AgentRunHooks, NoopAgentRunHooks};
use super::run_context::RunContext;
use super::runner::{AgentRunParams, ToolLoopAgentRunner, DEFAULT_MAX_STEPS};

/// A delegate agent behind a handoff tool: its own persona and tool set.
#[derive(Clone)]
pub struct SubAgent {
    pub name: String,
    /// Persona / system prompt for the delegate's runs.
    pub instructions: Option<String>,
    pub tool_set: ToolSet,
}

impl SubAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            tool_set: ToolSet::empty(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_tool_set(mut self, tool_set: ToolSet) -> Self {
        self.tool_set = tool_set;
        self
    }
}

/// Tool wrapping a full nested agent behind one callable surface.
///
/// Named `transfer_to_{agent}`. Invocation drives a nested
/// [`ToolLoopAgentRunner`] to completion — own request, own step budget,
/// own message log (sharing only the parent's ambient state handle) — and
/// returns the delegate's final text as the tool result.
pub struct HandoffTool {
    agent: SubAgent,
    name: String,
    description: String,
    parameters: serde_json::Value,
    provider: Arc<dyn Provider>,
    fallback_providers: Vec<Arc<dyn Provider>>,
    tool_executor: Arc<dyn ToolExecutor>,
    hooks: Arc<dyn AgentRunHooks>,
    max_steps: usize,
}

impl HandoffTool {
    /// Create a handoff tool for `agent`, running it on `provider` (the
    /// delegate's provider override, or the parent's default).
    pub fn new(agent: SubAgent, provider: Arc<dyn Provider>) -> Self {
        let name = format!("transfer_to_{}", agent.name);
        let description = format!("Delegate a task to the {} agent to handle the request.", agent.name);
        Self {
            agent,
            name,
            description,
            parameters: Self::default_parameters(),
            provider,
            fallback_providers: Vec::new(),
            tool_executor: Arc::new(FunctionToolExecutor),
            hooks: Arc::new(NoopAgentRunHooks),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Override the description shown to the parent's model.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Override the parameter schema shown to the parent's model.
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_fallback_providers(mut self, providers: Vec<Arc<dyn Provider>>) -> Self {
        self.fallback_providers = providers;
        self
    }

    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tool_executor = executor;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn AgentRunHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Step budget for the delegate's runs.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn agent(&self) -> &SubAgent {
        &self.agent
    }

    fn default_parameters() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The task to hand off to the agent. A clear and concise request or instruction.",
                },
                "image_urls": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional image references (public URLs or local paths) for multimodal tasks.",
                },
                "background_task": {
                    "type": "boolean",
                    "description": "Defaults to false. Set to true if the task may take noticeable time or the user does not need to wait.",
                },
            },
            "required": ["input"],
        })
    }
}

#[async_trait]
impl FunctionTool for HandoffTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }

    async fn call(
        &self,
        ctx: &mut RunContext,
        args: serde_json::Value,
    ) -> Result<ToolCallResult, BotloopError> {
        let input = args
            .get("input")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BotloopError::InvalidArgument("handoff requires an 'input' string".into()))?;
        let image_urls: Vec<String> = args
            .get("image_urls")
            .and_then(|v| v.as_array())
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| u.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        // Scheduling hint only; the delegate runs inline either way.
        let background_task = args
            .get("background_task")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        debug!(agent = %self.agent.name, background_task, "delegating to sub-agent");

        let mut request = ProviderRequest::new(input, format!("handoff:{}", self.agent.name))
            .with_image_urls(image_urls)
            .with_tool_set(self.agent.tool_set.clone());
        if let Some(ref instructions) = self.agent.instructions {
            request = request.with_system_prompt(instructions.clone());
        }

        let mut runner = ToolLoopAgentRunner::new();
        runner.reset(
            AgentRunParams::new(self.provider.clone(), request)
                .with_fallback_providers(self.fallback_providers.clone())
                .with_run_context(RunContext::with_state_handle(ctx.state_handle()))
                .with_tool_executor(self.tool_executor.clone())
                .with_hooks(self.hooks.clone()),
        );

        {
            let events = runner.step_until_done(self.max_steps);
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                event.map_err(|e| BotloopError::tool(&self.name, e.to_string()))?;
            }
        }

        let text = runner
            .final_llm_resp()
            .map(|r| r.completion_text.clone())
            .unwrap_or_default();
        debug!(agent = %self.agent.name, "sub-agent run finished");
        Ok(ToolCallResult::text(text))
    }
}
