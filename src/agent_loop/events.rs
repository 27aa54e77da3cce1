//! Events yielded by the agent loop.

use serde::Serialize;

use crate::types::LlmResponse;

/// One event from a runner's step stream, translated by the pipeline into
/// outgoing platform messages.
///
/// Per step, buffered mode yields exactly one terminal event; streaming
/// mode yields zero or more `streaming_delta` events followed by exactly
/// one terminal event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Non-terminal incremental fragment (`chunk.completion_text` is a delta).
    StreamingDelta { chunk: LlmResponse },
    /// Terminal: the step produced a final answer.
    LlmResult { response: LlmResponse },
    /// Terminal: the step requested tool calls; another step follows.
    ToolCall { response: LlmResponse },
    /// Terminal: the run was cooperatively aborted; the response carries the
    /// partial text accumulated before the stop was observed.
    Aborted { response: LlmResponse },
}

impl AgentEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::StreamingDelta { .. })
    }

    /// The response payload carried by this event.
    pub fn response(&self) -> &LlmResponse {
        match self {
            Self::StreamingDelta { chunk } => chunk,
            Self::LlmResult { response }
            | Self::ToolCall { response }
            | Self::Aborted { response } => response,
        }
    }
}
