//! Error types for botloop.

use thiserror::Error;

/// Primary error type for all botloop operations.
#[derive(Error, Debug)]
pub enum BotloopError {
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("No provider available: all {attempts} provider(s) failed — last error: {last_error}")]
    NoProviderAvailable { attempts: usize, last_error: String },

    #[error(
        "Malformed tool calls: {names} name(s), {args} argument object(s), {ids} id(s) — lists must be parallel"
    )]
    MalformedToolCalls { names: usize, args: usize, ids: usize },

    #[error("Tool execution error: {tool_name} — {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl BotloopError {
    /// Create an API error from a status code and body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a transient provider failure that the in-step
    /// fallback chain is allowed to absorb.
    pub fn is_provider_transient(&self) -> bool {
        matches!(
            self,
            Self::Api { .. }
                | Self::Network(_)
                | Self::Authentication(_)
                | Self::RateLimited { .. }
                | Self::Stream(_)
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BotloopError>;
