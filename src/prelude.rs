//! Convenience re-exports for common use.

pub use crate::agent_loop::{
    AgentEvent, AgentRunHooks, AgentRunParams, HandoffTool, NoopAgentRunHooks, RunContext,
    StopSignal, SubAgent, ToolLoopAgentRunner, DEFAULT_MAX_STEPS,
};
pub use crate::config::BotloopConfig;
pub use crate::error::{BotloopError, Result};
pub use crate::provider::{OpenAiCompatProvider, Provider};
pub use crate::registry::{ActiveEventHandle, ActiveEventRegistry};
pub use crate::tools::{
    ClosureTool, FunctionTool, FunctionToolExecutor, ToolCallResult, ToolExecutor, ToolSet,
};
pub use crate::types::{
    AgentMessage, LlmResponse, ProviderRequest, Role, TokenUsage, ToolCall,
};
