//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent_loop::RunContext;
use crate::error::BotloopError;

use super::executor::ToolCallResult;

/// A named, schema-described capability a provider response may request.
#[async_trait]
pub trait FunctionTool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters(&self) -> &serde_json::Value;

    /// Inactive tools stay in their set but are not offered to providers.
    fn active(&self) -> bool {
        true
    }

    /// Invoke the tool against shared run state.
    async fn call(
        &self,
        ctx: &mut RunContext,
        args: serde_json::Value,
    ) -> Result<ToolCallResult, BotloopError>;
}

type ToolHandler = dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<ToolCallResult, BotloopError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
///
/// Tools that need the run context implement [`FunctionTool`] directly.
pub struct ClosureTool {
    name: String,
    description: String,
    parameters: serde_json::Value,
    active: bool,
    handler: Arc<ToolHandler>,
}

impl ClosureTool {
    /// Create a tool from an async closure over its parsed arguments.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        handler: F,
    ) -> Self
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolCallResult, BotloopError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            active: true,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

#[async_trait]
impl FunctionTool for ClosureTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }

    fn active(&self) -> bool {
        self.active
    }

    async fn call(
        &self,
        _ctx: &mut RunContext,
        args: serde_json::Value,
    ) -> Result<ToolCallResult, BotloopError> {
        (self.handler)(args).await
    }
}

impl std::fmt::Debug for ClosureTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureTool")
            .field("name", &self.name)
            .field("active", &self.active)
            .finish()
    }
}

/// An empty object schema for tools without parameters.
pub fn empty_parameters() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": [],
    })
}
