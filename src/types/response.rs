//! Provider response type.

use serde::{Deserialize, Serialize};

use crate::error::BotloopError;

use super::message::{Role, ToolCall};
use super::usage::TokenUsage;

/// One response (or streaming fragment) from a provider.
///
/// Streaming providers yield zero or more responses with `is_chunk = true`
/// whose `completion_text` is a delta, followed by exactly one terminal
/// response with `is_chunk = false` carrying the full accumulated text, any
/// requested tool calls and the usage counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub role: Role,
    pub completion_text: String,
    /// Parallel ordered tool-call lists; all three must have equal length.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_call_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_call_args: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_call_ids: Vec<String>,
    #[serde(default)]
    pub usage: TokenUsage,
    /// True for non-terminal streaming fragments.
    #[serde(default)]
    pub is_chunk: bool,
}

impl LlmResponse {
    /// Create a terminal assistant response.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            completion_text: text.into(),
            tools_call_name: Vec::new(),
            tools_call_args: Vec::new(),
            tools_call_ids: Vec::new(),
            usage: TokenUsage::default(),
            is_chunk: false,
        }
    }

    /// Create an error-flagged response (user-visible error text).
    pub fn err(text: impl Into<String>) -> Self {
        Self {
            role: Role::Err,
            ..Self::assistant(text)
        }
    }

    /// Create a non-terminal streaming fragment carrying a text delta.
    pub fn chunk(delta: impl Into<String>) -> Self {
        Self {
            is_chunk: true,
            ..Self::assistant(delta)
        }
    }

    /// Append one tool call, keeping the parallel lists aligned.
    pub fn with_tool_call(
        mut self,
        name: impl Into<String>,
        arguments: serde_json::Value,
        id: impl Into<String>,
    ) -> Self {
        self.tools_call_name.push(name.into());
        self.tools_call_args.push(arguments);
        self.tools_call_ids.push(id.into());
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn is_err(&self) -> bool {
        self.role == Role::Err
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tools_call_name.is_empty()
    }

    /// Zip the parallel tool-call lists into [`ToolCall`] values.
    ///
    /// Misaligned lists are a fatal contract violation, never repaired.
    pub fn tool_call_pairs(&self) -> Result<Vec<ToolCall>, BotloopError> {
        if self.tools_call_name.len() != self.tools_call_args.len()
            || self.tools_call_name.len() != self.tools_call_ids.len()
        {
            return Err(BotloopError::MalformedToolCalls {
                names: self.tools_call_name.len(),
                args: self.tools_call_args.len(),
                ids: self.tools_call_ids.len(),
            });
        }
        Ok(self
            .tools_call_name
            .iter()
            .zip(&self.tools_call_args)
            .zip(&self.tools_call_ids)
            .map(|((name, args), id)| ToolCall {
                id: id.clone(),
                name: name.clone(),
                arguments: args.clone(),
            })
            .collect())
    }
}
