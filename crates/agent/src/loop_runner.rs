//! The tool-calling loop for one repository.
//!
//! ```text
//! Init ─▶ AwaitingModel ─▶ DispatchingTools ─┐
//!              ▲                              │
//!              └──────────────────────────────┘
//!              │
//!              └─▶ Done (no tool calls) ─▶ extraction
//! ```
//!
//! Each round prunes the history, sends it with the tool declarations, and
//! either finishes (the model answered in text) or runs every requested tool
//! and goes round again. The round cap is the only liveness guarantee.

use crate::budget::{BudgetPolicy, TokenBudgeter};
use crate::extract::extract_summary;
use crate::prompt;
use prdigest_config::AppConfig;
use prdigest_core::error::AgentError;
use prdigest_core::message::{Conversation, Message, MessageToolCall};
use prdigest_core::provider::{Provider, ProviderRequest, ToolChoice, ToolDefinition};
use prdigest_core::summary::{RepoSummary, TimeWindow};
use prdigest_core::tool::ToolHost;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    DispatchingTools(Vec<MessageToolCall>),
    Done(String),
}

/// Drives one summary conversation per repository.
pub struct SummaryAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_rounds: u32,
    budgeter: TokenBudgeter,
    tools: Vec<ToolDefinition>,
}

impl SummaryAgent {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            max_rounds: 20,
            budgeter: TokenBudgeter::default(),
            tools: prdigest_toolhost::summarizer_tools(),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, &config.model.name)
            .with_temperature(config.model.temperature)
            .with_max_tokens(config.model.max_tokens)
            .with_max_rounds(config.agent.max_rounds)
            .with_budget(BudgetPolicy::from(&config.agent))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_budget(mut self, policy: BudgetPolicy) -> Self {
        self.budgeter = TokenBudgeter::new(policy);
        self
    }

    /// Replace the tool declarations sent with every request.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Summarize the merged pull requests of `owner/repo` inside `window`.
    pub async fn summarize(
        &self,
        host: &dyn ToolHost,
        owner: &str,
        repo: &str,
        window: &TimeWindow,
    ) -> prdigest_core::Result<RepoSummary> {
        let mut conversation = Conversation::new();
        conversation.push(Message::system(prompt::system_prompt()));
        conversation.push(Message::user(prompt::repo_request(owner, repo, window)));

        info!(repo = %format!("{owner}/{repo}"), %window, "Summarizing repository");
        let text = self.run(host, &mut conversation).await?;
        let summary = extract_summary(owner, repo, &text);
        info!(
            repo = %summary.full_name(),
            pull_requests = summary.pull_requests.len(),
            breaking_changes = summary.breaking_changes.len(),
            "Summary complete"
        );
        Ok(summary)
    }

    /// Run the loop on a prepared conversation and return the model's final text.
    pub async fn run(
        &self,
        host: &dyn ToolHost,
        conversation: &mut Conversation,
    ) -> prdigest_core::Result<String> {
        let mut round: u32 = 0;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if round >= self.max_rounds {
                        warn!(rounds = round, "Round cap reached without a final answer");
                        return Err(AgentError::Exhausted { rounds: round }.into());
                    }
                    round += 1;
                    self.await_model(conversation, round).await?
                }
                LoopState::DispatchingTools(calls) => {
                    debug!(round, tool_count = calls.len(), "Dispatching tool calls");
                    for call in &calls {
                        let reply = self.dispatch(host, call).await;
                        conversation.push(Message::tool_result(&call.id, reply));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done(text) => {
                    debug!(round, "Model returned a final answer");
                    return Ok(text);
                }
            };
        }
    }

    async fn await_model(
        &self,
        conversation: &mut Conversation,
        round: u32,
    ) -> prdigest_core::Result<LoopState> {
        let messages = std::mem::take(&mut conversation.messages);
        conversation.messages = self.budgeter.budget_conversation(messages);

        let unanswered = conversation.unanswered_tool_calls();
        if !unanswered.is_empty() {
            return Err(AgentError::UnansweredToolCalls { ids: unanswered }.into());
        }

        debug!(
            round,
            messages = conversation.messages.len(),
            estimated_tokens = crate::budget::estimate_messages(&conversation.messages),
            "Sending conversation"
        );

        let request = ProviderRequest {
            model: self.model.clone(),
            messages: conversation.messages.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.tools.clone(),
            tool_choice: ToolChoice::Auto,
        };

        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                round,
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model usage"
            );
        }
        let Some(message) = response.message else {
            return Err(AgentError::EmptyResponse { round }.into());
        };

        let next = if message.has_tool_calls() {
            LoopState::DispatchingTools(message.tool_calls.clone())
        } else {
            LoopState::Done(message.content.clone())
        };
        conversation.push(message);
        Ok(next)
    }

    /// Run one tool call and produce the text of its tool message.
    async fn dispatch(&self, host: &dyn ToolHost, call: &MessageToolCall) -> String {
        let arguments = match parse_arguments(&call.arguments) {
            Ok(args) => args,
            Err(reason) => {
                warn!(tool = %call.name, %reason, "Rejected tool call arguments");
                return format!("Error: {reason}");
            }
        };

        trace!(tool = %call.name, %arguments, "Tool call");
        let result = host.invoke(&call.name, arguments).await;
        let text = result.joined_text();

        if result.is_error {
            debug!(tool = %call.name, "Tool returned an error");
            return format!("Error: {text}");
        }
        self.budgeter.fit_tool_result(&call.name, &text)
    }
}

/// Parse a tool call's serialized arguments. An empty payload means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("tool arguments must be a JSON object, got {other}")),
        Err(e) => Err(format!("tool arguments are not valid JSON: {e}")),
    }
}
