//! # Anthropic Messages Client
//!
//! Calls the Anthropic messages API with the TV tool set.
//!
//! ## Conversation shaping:
//! The stored history is converted into API messages on every call:
//! - leading assistant turns (left behind when the sliding window trimmed their
//!   user turn) are skipped, because a conversation must open with the user
//! - a user turn that follows an assistant turn with tool calls is prefixed with a
//!   `tool_result` block per call; the TV executes commands fire-and-forget, so
//!   every result is a plain acknowledgement
//! - block kinds the relay does not model are not sent back

use crate::commands::ToolDefinition;
use crate::config::IntentConfig;
use crate::conversation::{ContentBlock, ConversationTurn, Role, TurnContent};
use crate::error::{AppError, AppResult};
use crate::intent::LanguageModel;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

pub struct AnthropicClient {
    http_client: Client,
    config: IntentConfig,
}

impl AnthropicClient {
    pub fn new(config: IntentConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Config(format!("failed to build intent HTTP client: {}", e)))?;

        Ok(Self { http_client, config })
    }

    fn build_request_body(&self, system: &str, turns: &[ConversationTurn], tools: &[ToolDefinition]) -> Value {
        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system,
            "tools": tools,
            "messages": to_api_messages(turns),
        })
    }
}

/// Convert stored turns into API messages (see module docs).
pub fn to_api_messages(turns: &[ConversationTurn]) -> Vec<Value> {
    let mut messages = Vec::with_capacity(turns.len());
    let mut pending_tool_ids: Vec<String> = Vec::new();

    for turn in turns.iter().skip_while(|turn| turn.role == Role::Assistant) {
        match turn.role {
            Role::Assistant => {
                pending_tool_ids = turn.tool_use_ids().into_iter().map(str::to_string).collect();
                messages.push(json!({
                    "role": "assistant",
                    "content": assistant_blocks(&turn.content),
                }));
            }
            Role::User => {
                let text = match &turn.content {
                    TurnContent::Text(text) => text.clone(),
                    TurnContent::Blocks(_) => continue,
                };

                if pending_tool_ids.is_empty() {
                    messages.push(json!({"role": "user", "content": text}));
                } else {
                    let mut content: Vec<Value> = pending_tool_ids
                        .drain(..)
                        .map(|id| json!({"type": "tool_result", "tool_use_id": id, "content": "ok"}))
                        .collect();
                    content.push(json!({"type": "text", "text": text}));
                    messages.push(json!({"role": "user", "content": content}));
                }
            }
        }
    }

    messages
}

fn assistant_blocks(content: &TurnContent) -> Value {
    match content {
        TurnContent::Text(text) => json!([{"type": "text", "text": text}]),
        TurnContent::Blocks(blocks) => Value::Array(
            blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(json!({"type": "text", "text": text})),
                    ContentBlock::ToolUse { id, name, input } => Some(json!({
                        "type": "tool_use",
                        "id": id,
                        "name": name,
                        "input": input,
                    })),
                    ContentBlock::Other => None,
                })
                .collect(),
        ),
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(
        &self,
        system: &str,
        turns: &[ConversationTurn],
        tools: &[ToolDefinition],
    ) -> AppResult<Vec<ContentBlock>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("no intent API key configured".to_string()))?;

        let start_time = Instant::now();
        let body = self.build_request_body(system, turns, tools);

        let response = self
            .http_client
            .post(&self.config.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "messages API returned {}: {}",
                status, body
            )));
        }

        let parsed: MessagesResponse = response.json().await?;
        debug!(
            blocks = parsed.content.len(),
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Model responded"
        );

        Ok(parsed.content)
    }
}
