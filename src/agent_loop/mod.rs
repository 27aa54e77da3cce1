//! Agent loop primitives (runner, run context, events, hooks, handoff).

pub mod events;
pub mod handoff;
pub mod hooks;
pub mod run_context;
pub mod runner;
pub mod signal;

pub use events::AgentEvent;
pub use handoff::{HandoffTool, SubAgent};
pub use hooks::{AgentRunHooks, NoopAgentRunHooks};
pub use run_context::RunContext;
pub use runner::{
    AgentRunParams, ToolLoopAgentRunner, DEFAULT_MAX_STEPS, TOOL_BUDGET_NOTICE,
};
pub use signal::StopSignal;
