//! Shared state for one agent run.

use std::any::Any;
use std::sync::Arc;

use crate::types::AgentMessage;

/// The ordered message log and ambient state shared by all steps of one run.
///
/// Exactly one runner owns a context at a time; tools receive it mutably
/// during their invocation. The ambient state is an opaque handle — tools
/// that need typed session state downcast it with [`RunContext::state`].
/// Nested (sub-agent) runs get a fresh log and a clone of the state handle.
pub struct RunContext {
    messages: Vec<AgentMessage>,
    state: Arc<dyn Any + Send + Sync>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(())
    }
}

impl RunContext {
    /// Create a context around an ambient state value.
    pub fn new(state: impl Any + Send + Sync) -> Self {
        Self {
            messages: Vec::new(),
            state: Arc::new(state),
        }
    }

    /// Create a context sharing an existing state handle (sub-agent runs).
    pub fn with_state_handle(state: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            messages: Vec::new(),
            state,
        }
    }

    /// Downcast the ambient state to a concrete type.
    pub fn state<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.state.downcast_ref()
    }

    /// Clone the opaque state handle.
    pub fn state_handle(&self) -> Arc<dyn Any + Send + Sync> {
        self.state.clone()
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&AgentMessage> {
        self.messages.last()
    }

    /// Append one message to the log.
    pub fn push(&mut self, message: AgentMessage) {
        self.messages.push(message);
    }

    /// Append several messages, preserving order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = AgentMessage>) {
        self.messages.extend(messages);
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("messages", &self.messages.len())
            .finish()
    }
}
