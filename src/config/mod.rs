//! Environment-driven configuration.

use std::fmt;

/// Ambient configuration for botloop.
///
/// Resolution is env-first: `.env` is loaded if present, then
/// `BOTLOOP_API_KEY`, `BOTLOOP_BASE_URL` and `BOTLOOP_MODEL` are read.
/// Values set in code take precedence over the environment.
#[derive(Clone, Default)]
pub struct BotloopConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
}

impl fmt::Debug for BotloopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotloopConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl BotloopConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables (and `.env` if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            api_key: std::env::var("BOTLOOP_API_KEY").ok(),
            base_url: std::env::var("BOTLOOP_BASE_URL").ok(),
            model: std::env::var("BOTLOOP_MODEL").ok(),
        }
    }

    /// Override the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}
