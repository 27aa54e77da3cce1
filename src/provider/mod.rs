//! Provider trait and backend implementations.

pub mod http;
pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::BotloopError;
use crate::types::{AgentMessage, LlmResponse, ProviderRequest};

/// Stream of responses from a streaming provider call.
pub type LlmResponseStream = BoxStream<'static, Result<LlmResponse, BotloopError>>;

/// One LLM backend's chat-completion capability, pre-bound to a model and
/// credentials by the provider-management layer.
///
/// Streaming contract: `chat_stream` yields zero or more responses with
/// `is_chunk = true` carrying text deltas, then exactly one terminal
/// response with `is_chunk = false` carrying the full accumulated text,
/// tool calls and usage.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier of this provider instance (for logs and fallback reporting).
    fn id(&self) -> &str;

    /// The model this instance serves.
    fn model(&self) -> &str;

    /// Buffered chat completion.
    async fn chat(&self, request: &ProviderRequest) -> Result<LlmResponse, BotloopError>;

    /// Incrementally-streamed chat completion.
    async fn chat_stream(&self, request: &ProviderRequest)
        -> Result<LlmResponseStream, BotloopError>;
}

/// Assemble the ordered message payload for a request.
///
/// Inside the agent loop `contexts` already holds the full log (prompt
/// included); for a standalone call with empty contexts the prompt becomes
/// the sole user message.
pub fn request_messages(request: &ProviderRequest) -> Vec<AgentMessage> {
    let mut messages = Vec::with_capacity(request.contexts.len() + 2);
    if let Some(ref system) = request.system_prompt {
        messages.push(AgentMessage::system(system.clone()));
    }
    messages.extend(request.contexts.iter().cloned());
    if request.contexts.is_empty() && !request.prompt.is_empty() {
        messages.push(AgentMessage::user_with_images(
            request.prompt.clone(),
            request.image_urls.clone(),
        ));
    }
    messages
}
