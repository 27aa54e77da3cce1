//! Provider request type.

use crate::tools::ToolSet;

use super::message::AgentMessage;

/// A request driven through the agent loop and sent to providers.
///
/// Built by the upstream pipeline from one inbound platform message. The
/// runner folds `prompt` and `image_urls` into the run context at reset;
/// by the time a provider sees the request, `contexts` holds the full
/// ordered message log for the run. A provider called outside the loop
/// (empty `contexts`) appends the prompt itself.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub prompt: String,
    /// Unified message origin identifying the conversation.
    pub session_key: String,
    pub image_urls: Vec<String>,
    pub contexts: Vec<AgentMessage>,
    pub system_prompt: Option<String>,
    /// Tools offered for this request; cleared when the step budget is exhausted.
    pub tool_set: Option<ToolSet>,
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>, session_key: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_key: session_key.into(),
            ..Self::default()
        }
    }

    pub fn with_contexts(mut self, contexts: Vec<AgentMessage>) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_image_urls(mut self, image_urls: Vec<String>) -> Self {
        self.image_urls = image_urls;
        self
    }

    pub fn with_tool_set(mut self, tool_set: ToolSet) -> Self {
        self.tool_set = Some(tool_set);
        self
    }
}
