//! botloop — agent-execution engine for a multi-platform conversational bot.
//!
//! For each inbound request, a [`agent_loop::ToolLoopAgentRunner`] drives a
//! bounded "ask model → maybe call tools → ask again" loop until a final
//! answer, the step budget, or a cancellation ends it — with provider
//! fallback inside each step and the same event contract for buffered and
//! incrementally-streamed output. The process-wide
//! [`registry::ActiveEventRegistry`] lets unrelated command handlers (user
//! "stop"/"reset") hard-stop or cooperatively flag a session's in-flight
//! runs.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use botloop::prelude::*;
//!
//! # async fn example() -> botloop::error::Result<()> {
//! let provider = Arc::new(OpenAiCompatProvider::from_config(&BotloopConfig::from_env())?);
//! let request = ProviderRequest::new("Hello!", "platform:group:42");
//!
//! let mut runner = ToolLoopAgentRunner::new();
//! runner.reset(AgentRunParams::new(provider, request));
//!
//! let events = runner.step_until_done(DEFAULT_MAX_STEPS);
//! futures::pin_mut!(events);
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod registry;
pub mod tools;
pub mod types;
