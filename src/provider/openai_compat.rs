//! OpenAI-compatible Chat Completions backend.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::config::BotloopConfig;
use crate::error::BotloopError;
use crate::types::{AgentMessage, LlmResponse, ProviderRequest, Role, TokenUsage};

use super::http::{bearer_headers, parse_sse_data, shared_client, status_to_error};
use super::{request_messages, LlmResponseStream, Provider};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider speaking the Chat Completions wire format, usable against any
/// OpenAI-compatible endpoint.
pub struct OpenAiCompatProvider {
    id: String,
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(
        id: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Build from ambient configuration.
    pub fn from_config(config: &BotloopConfig) -> Result<Self, BotloopError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| BotloopError::Authentication("Missing BOTLOOP_API_KEY".into()))?;
        let model = config
            .model()
            .ok_or_else(|| BotloopError::InvalidArgument("Missing BOTLOOP_MODEL".into()))?;
        Ok(Self::new(
            "openai_compat",
            model,
            api_key,
            config.base_url().map(str::to_string),
        ))
    }

    fn build_request_body(&self, request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let messages = request_messages(request)
            .iter()
            .map(message_to_wire)
            .collect::<Vec<_>>();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        });

        if let Some(obj) = body.as_object_mut() {
            if stream {
                obj.insert(
                    "stream_options".into(),
                    serde_json::json!({ "include_usage": true }),
                );
            }
            if let Some(ref tool_set) = request.tool_set {
                let defs = tool_set.definitions();
                if !defs.is_empty() {
                    let tools: Vec<serde_json::Value> = defs
                        .iter()
                        .map(|d| {
                            serde_json::json!({
                                "type": "function",
                                "function": {
                                    "name": d.name,
                                    "description": d.description,
                                    "parameters": d.parameters,
                                }
                            })
                        })
                        .collect();
                    obj.insert("tools".into(), tools.into());
                }
            }
        }

        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ProviderRequest) -> Result<LlmResponse, BotloopError> {
        let body = self.build_request_body(request, false);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, session = %request.session_key, "chat completion");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: WireChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BotloopError::api(200, "No choices in chat response"))?;

        let mut response = LlmResponse::assistant(choice.message.content.unwrap_or_default());
        for tc in choice.message.tool_calls.unwrap_or_default() {
            response = response.with_tool_call(
                tc.function.name,
                parse_arguments(&tc.function.arguments),
                tc.id,
            );
        }
        if let Some(usage) = data.usage {
            response = response.with_usage(TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
        }
        Ok(response)
    }

    async fn chat_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<LlmResponseStream, BotloopError> {
        let body = self.build_request_body(request, true);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, session = %request.session_key, "chat completion (stream)");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = String::new();
            let mut full_text = String::new();
            let mut tool_calls: Vec<(String, String, String)> = Vec::new();
            let mut usage: Option<TokenUsage> = None;
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        yield Err(BotloopError::Network(e));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = parse_sse_data(&line) else {
                        continue;
                    };
                    let Ok(chunk) = serde_json::from_str::<WireStreamChunk>(data) else {
                        continue; // skip unparseable chunks
                    };

                    if let Some(u) = chunk.usage {
                        usage = Some(TokenUsage::new(u.prompt_tokens, u.completion_tokens));
                    }
                    let Some(choice) = chunk.choices.into_iter().next() else {
                        continue;
                    };
                    if let Some(text) = choice.delta.content {
                        if !text.is_empty() {
                            full_text.push_str(&text);
                            yield Ok(LlmResponse::chunk(text));
                        }
                    }
                    for frag in choice.delta.tool_calls.unwrap_or_default() {
                        if frag.index >= tool_calls.len() {
                            tool_calls.resize(frag.index + 1, Default::default());
                        }
                        let slot = &mut tool_calls[frag.index];
                        if let Some(id) = frag.id {
                            slot.0 = id;
                        }
                        if let Some(f) = frag.function {
                            if let Some(name) = f.name {
                                slot.1 = name;
                            }
                            if let Some(args) = f.arguments {
                                slot.2.push_str(&args);
                            }
                        }
                    }
                }
            }

            let mut terminal = LlmResponse::assistant(full_text);
            for (id, name, args) in tool_calls {
                terminal = terminal.with_tool_call(name, parse_arguments(&args), id);
            }
            if let Some(u) = usage {
                terminal = terminal.with_usage(u);
            }
            yield Ok(terminal);
        };

        Ok(Box::pin(stream))
    }
}

fn parse_arguments(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn message_to_wire(msg: &AgentMessage) -> serde_json::Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        // Error-flagged history replays as assistant text; the wire format
        // has no err role.
        Role::Assistant | Role::Err => "assistant",
        Role::Tool => "tool",
    };

    if let Some(ref tool_call_id) = msg.tool_call_id {
        return serde_json::json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "content": msg.content,
        });
    }

    if msg.has_tool_calls() {
        let calls: Vec<serde_json::Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.name,
                        "arguments": tc.arguments.to_string(),
                    }
                })
            })
            .collect();
        return serde_json::json!({
            "role": role,
            "content": if msg.content.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String(msg.content.clone())
            },
            "tool_calls": calls,
        });
    }

    if !msg.image_urls.is_empty() {
        let mut parts = vec![serde_json::json!({ "type": "text", "text": msg.content })];
        parts.extend(msg.image_urls.iter().map(|url| {
            serde_json::json!({ "type": "image_url", "image_url": { "url": url } })
        }));
        return serde_json::json!({ "role": role, "content": parts });
    }

    serde_json::json!({ "role": role, "content": msg.content })
}

// Wire response types (internal)

#[derive(Deserialize)]
struct WireChatResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct WireStreamChunk {
    #[serde(default)]
    choices: Vec<WireStreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireStreamChoice {
    delta: WireStreamDelta,
}

#[derive(Deserialize)]
struct WireStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallFragment>>,
}

#[derive(Deserialize)]
struct WireToolCallFragment {
    index: usize,
    id: Option<String>,
    function: Option<WireFunctionFragment>,
}

#[derive(Deserialize)]
struct WireFunctionFragment {
    name: Option<String>,
    arguments: Option<String>,
}
