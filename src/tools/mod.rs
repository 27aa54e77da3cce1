//! Tool system for function calling.

pub mod executor;
pub mod tool;
pub mod tool_set;

pub use executor::{FunctionToolExecutor, ToolCallResult, ToolExecutor, ToolResultStream};
pub use tool::{empty_parameters, ClosureTool, FunctionTool};
pub use tool_set::{ToolDefinition, ToolSet};
