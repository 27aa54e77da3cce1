//! The tool-loop agent runner.

use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::{BotloopError, Result};
use crate::provider::Provider;
use crate::tools::{FunctionToolExecutor, ToolCallResult, ToolExecutor};
use crate::types::{AgentMessage, LlmResponse, ProviderRequest, Role};

use super::events::AgentEvent;
use super::hooks::{AgentRunHooks, NoopAgentRunHooks};
use super::run_context::RunContext;
use super::signal::StopSignal;

/// Default step budget, matching the bot-wide `max_agent_step` setting.
pub const DEFAULT_MAX_STEPS: usize = 30;

/// Synthetic user notice injected when the step budget is reached.
pub const TOOL_BUDGET_NOTICE: &str = "The tool-call step limit for this request has been reached. \
    Tools are no longer available; produce your final answer from the information gathered so far.";

/// Everything one run needs; consumed by [`ToolLoopAgentRunner::reset`].
pub struct AgentRunParams {
    pub provider: Arc<dyn Provider>,
    pub fallback_providers: Vec<Arc<dyn Provider>>,
    pub request: ProviderRequest,
    pub run_context: RunContext,
    pub tool_executor: Arc<dyn ToolExecutor>,
    pub hooks: Arc<dyn AgentRunHooks>,
    pub streaming: bool,
}

impl AgentRunParams {
    pub fn new(provider: Arc<dyn Provider>, request: ProviderRequest) -> Self {
        Self {
            provider,
            fallback_providers: Vec::new(),
            request,
            run_context: RunContext::default(),
            tool_executor: Arc::new(FunctionToolExecutor),
            hooks: Arc::new(NoopAgentRunHooks),
            streaming: false,
        }
    }

    pub fn with_fallback_providers(mut self, providers: Vec<Arc<dyn Provider>>) -> Self {
        self.fallback_providers = providers;
        self
    }

    pub fn with_run_context(mut self, run_context: RunContext) -> Self {
        self.run_context = run_context;
        self
    }

    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tool_executor = executor;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn AgentRunHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

struct RunState {
    provider: Arc<dyn Provider>,
    fallback_providers: Vec<Arc<dyn Provider>>,
    req: ProviderRequest,
    run_context: RunContext,
    tool_executor: Arc<dyn ToolExecutor>,
    hooks: Arc<dyn AgentRunHooks>,
    streaming: bool,
    started: bool,
    step_count: usize,
    done: bool,
    aborted: bool,
    final_resp: Option<LlmResponse>,
}

/// Outcome of one provider attempt within a step.
enum Attempt {
    Response(LlmResponse),
    Failed(BotloopError),
    Aborted(String),
}

/// The request/tool-call/response state machine.
///
/// A plain reentrant value: construct (or [`Default`]) one per top-level
/// run, [`reset`](Self::reset) it, drive it with
/// [`step_until_done`](Self::step_until_done), then discard it — it holds
/// no cross-run state. Sub-agent delegation constructs nested runners the
/// same way.
#[derive(Default)]
pub struct ToolLoopAgentRunner {
    run: Option<RunState>,
    stop: StopSignal,
}

impl ToolLoopAgentRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)initialize all state for one run. Must precede stepping.
    ///
    /// Seeds the run context with the request's prior context messages and
    /// a user message built from the prompt and image references, and
    /// installs a fresh cooperative-stop flag (clones of the previous
    /// run's [`StopSignal`] no longer reach this runner).
    pub fn reset(&mut self, params: AgentRunParams) {
        let AgentRunParams {
            provider,
            fallback_providers,
            request,
            mut run_context,
            tool_executor,
            hooks,
            streaming,
        } = params;

        run_context.extend(request.contexts.iter().cloned());
        if !request.prompt.is_empty() || !request.image_urls.is_empty() {
            run_context.push(AgentMessage::user_with_images(
                request.prompt.clone(),
                request.image_urls.clone(),
            ));
        }

        self.stop = StopSignal::new();
        self.run = Some(RunState {
            provider,
            fallback_providers,
            req: request,
            run_context,
            tool_executor,
            hooks,
            streaming,
            started: false,
            step_count: 0,
            done: false,
            aborted: false,
            final_resp: None,
        });
    }

    /// Idempotently raise the cooperative-stop flag.
    ///
    /// Observed at step start and between streaming deltas; an in-flight
    /// buffered call always completes once issued.
    pub fn request_stop(&self) {
        self.stop.request();
    }

    /// Clone of the flag checked by this run, for wiring into an
    /// active-event handle (or a test) that must stop the runner while its
    /// event stream holds the mutable borrow.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn done(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.done)
    }

    pub fn was_aborted(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.aborted)
    }

    pub fn step_count(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.step_count)
    }

    /// The last authoritative response, or `None` before any completed step.
    pub fn final_llm_resp(&self) -> Option<&LlmResponse> {
        self.run.as_ref().and_then(|r| r.final_resp.as_ref())
    }

    pub fn run_context(&self) -> Option<&RunContext> {
        self.run.as_ref().map(|r| &r.run_context)
    }

    pub fn request(&self) -> Option<&ProviderRequest> {
        self.run.as_ref().map(|r| &r.req)
    }

    /// One loop iteration as a pull-based event stream.
    ///
    /// Buffered mode yields one terminal event; streaming mode yields zero
    /// or more `streaming_delta` events then one terminal event. The first
    /// call of a run fires `on_agent_begin`. On an already-done runner the
    /// stream is empty.
    pub fn step(&mut self) -> impl Stream<Item = Result<AgentEvent>> + '_ {
        let stop = self.stop.clone();
        stream! {
            let state = match self.run.as_mut() {
                Some(state) => state,
                None => {
                    yield Err(BotloopError::InvalidState("step() called before reset()".into()));
                    return;
                }
            };
            if state.done {
                return;
            }

            if !state.started {
                state.started = true;
                let hooks = state.hooks.clone();
                hooks.on_agent_begin(&mut state.run_context).await;
            }

            state.step_count += 1;
            let step_index = state.step_count;
            debug!(step = step_index, streaming = state.streaming, "agent step");

            // Abort outranks everything else observed this step, including
            // budget exhaustion.
            let mut aborted_partial: Option<String> = None;
            if stop.is_requested() {
                aborted_partial = Some(String::new());
            }

            let mut authoritative: Option<LlmResponse> = None;
            let mut last_err: Option<BotloopError> = None;

            if aborted_partial.is_none() {
                // Providers see the full ordered log accumulated so far.
                state.req.contexts = state.run_context.messages().to_vec();

                let providers: Vec<Arc<dyn Provider>> = std::iter::once(state.provider.clone())
                    .chain(state.fallback_providers.iter().cloned())
                    .collect();
                let total = providers.len();

                for (idx, provider) in providers.into_iter().enumerate() {
                    if idx > 0 {
                        warn!(
                            provider = provider.id(),
                            attempt = idx + 1,
                            "falling back to next provider"
                        );
                    }
                    let is_last = idx + 1 == total;

                    let attempt: Attempt;
                    if state.streaming {
                        match provider.chat_stream(&state.req).await {
                            Err(e) => attempt = Attempt::Failed(e),
                            Ok(mut responses) => {
                                let mut acc = String::new();
                                let mut found: Option<Attempt> = None;
                                loop {
                                    // Checkpoint between deltas.
                                    if stop.is_requested() {
                                        found = Some(Attempt::Aborted(std::mem::take(&mut acc)));
                                        break;
                                    }
                                    match responses.next().await {
                                        None => break,
                                        Some(Err(e)) => {
                                            found = Some(Attempt::Failed(e));
                                            break;
                                        }
                                        Some(Ok(chunk)) if chunk.is_chunk => {
                                            acc.push_str(&chunk.completion_text);
                                            yield Ok(AgentEvent::StreamingDelta { chunk });
                                        }
                                        Some(Ok(terminal)) => {
                                            found = Some(Attempt::Response(terminal));
                                            break;
                                        }
                                    }
                                }
                                attempt = found.unwrap_or_else(|| {
                                    Attempt::Failed(BotloopError::Stream(
                                        "stream ended without a terminal response".into(),
                                    ))
                                });
                            }
                        }
                    } else {
                        attempt = match provider.chat(&state.req).await {
                            Ok(response) => Attempt::Response(response),
                            Err(e) => Attempt::Failed(e),
                        };
                    }

                    match attempt {
                        Attempt::Aborted(partial) => {
                            aborted_partial = Some(partial);
                            break;
                        }
                        Attempt::Response(response) if !response.is_err() => {
                            authoritative = Some(response);
                            break;
                        }
                        Attempt::Response(response) => {
                            warn!(
                                provider = provider.id(),
                                "provider returned error response: {}", response.completion_text
                            );
                            if is_last {
                                // The last attempt's outcome is authoritative,
                                // error-flagged or not.
                                authoritative = Some(response);
                                break;
                            }
                        }
                        Attempt::Failed(e) => {
                            warn!(provider = provider.id(), error = %e, "provider call failed");
                            last_err = Some(e);
                        }
                    }
                }
            }

            if let Some(partial) = aborted_partial {
                let response = LlmResponse::assistant(partial);
                state.aborted = true;
                state.done = true;
                state.run_context.push(AgentMessage::assistant(response.completion_text.clone()));
                state.final_resp = Some(response.clone());
                let hooks = state.hooks.clone();
                hooks.on_agent_done(&mut state.run_context, &response).await;
                debug!(step = step_index, "agent run aborted");
                yield Ok(AgentEvent::Aborted { response });
                return;
            }

            let response = match authoritative {
                Some(response) => response,
                None => {
                    let attempts = 1 + state.fallback_providers.len();
                    let last_error = last_err
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown provider failure".into());
                    yield Err(BotloopError::NoProviderAvailable { attempts, last_error });
                    return;
                }
            };

            state.final_resp = Some(response.clone());

            let wants_tools = response.has_tool_calls() && state.req.tool_set.is_some();
            if !wants_tools {
                if response.has_tool_calls() {
                    warn!("ignoring tool calls requested without an offered tool set");
                }
                let message = match response.role {
                    Role::Err => AgentMessage::err(response.completion_text.clone()),
                    _ => AgentMessage::assistant(response.completion_text.clone()),
                };
                state.run_context.push(message);
                state.done = true;
                let hooks = state.hooks.clone();
                hooks.on_agent_done(&mut state.run_context, &response).await;
                debug!(step = step_index, "agent run complete");
                yield Ok(AgentEvent::LlmResult { response });
                return;
            }

            // Tool step: append the assistant request, then execute each
            // call in order. Malformed call lists are fatal, never repaired.
            let calls = match response.tool_call_pairs() {
                Ok(calls) => calls,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            state.run_context.push(AgentMessage::assistant_with_tool_calls(
                response.completion_text.clone(),
                calls.clone(),
            ));
            yield Ok(AgentEvent::ToolCall { response: response.clone() });

            let executor = state.tool_executor.clone();
            let hooks = state.hooks.clone();
            for call in calls {
                let Some(tool) = state.req.tool_set.as_ref().and_then(|ts| ts.get(&call.name)) else {
                    warn!(tool = %call.name, "requested tool not found in set");
                    state.run_context.push(AgentMessage::tool_result(
                        call.id.clone(),
                        format!("Tool '{}' not found", call.name),
                    ));
                    continue;
                };

                hooks.on_tool_start(&mut state.run_context, tool.as_ref(), &call.arguments).await;
                debug!(tool = %call.name, "executing tool");

                // The last fragment is the authoritative result; a failing
                // fragment propagates uncaught, leaving the log consistent
                // (assistant request appended, no partial tool result).
                let mut result: Option<ToolCallResult> = None;
                let mut failure: Option<BotloopError> = None;
                {
                    let mut fragments =
                        executor.execute(tool.clone(), &mut state.run_context, call.arguments.clone());
                    while let Some(fragment) = fragments.next().await {
                        match fragment {
                            Ok(fragment) => result = Some(fragment),
                            Err(e) => {
                                failure = Some(e);
                                break;
                            }
                        }
                    }
                }
                if let Some(e) = failure {
                    yield Err(e);
                    return;
                }
                let result = result.unwrap_or_else(|| ToolCallResult::text(""));

                hooks.on_tool_end(&mut state.run_context, tool.as_ref(), &call.arguments, &result).await;
                state.run_context.push(AgentMessage::tool_result(
                    call.id.clone(),
                    result.content.clone(),
                ));
            }
            // done stays false; the owner drives another step.
        }
    }

    /// Drive [`step`](Self::step) until the run is done.
    ///
    /// Immediately before the call at step index == `max_steps`, takes the
    /// request's tool set (exactly once) and appends the budget-exhaustion
    /// notice so the forced final call is tool-free. A no-op on an
    /// already-done runner.
    pub fn step_until_done(
        &mut self,
        max_steps: usize,
    ) -> impl Stream<Item = Result<AgentEvent>> + '_ {
        let max_steps = max_steps.max(1);
        stream! {
            if self.run.is_none() {
                yield Err(BotloopError::InvalidState(
                    "step_until_done() called before reset()".into(),
                ));
                return;
            }
            loop {
                {
                    let Some(state) = self.run.as_mut() else { break };
                    if state.done {
                        break;
                    }
                    if state.step_count + 1 >= max_steps {
                        if state.req.tool_set.take().is_some() {
                            debug!(max_steps, "step budget reached; forcing a tool-free final call");
                            state.run_context.push(AgentMessage::user(TOOL_BUDGET_NOTICE));
                        }
                    }
                }

                let step = self.step();
                futures::pin_mut!(step);
                while let Some(event) = step.next().await {
                    match event {
                        Ok(event) => yield Ok(event),
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        }
    }
}
