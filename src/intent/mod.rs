//! # Intent Extraction
//!
//! Turns a transcribed utterance into TV commands plus a short spoken reply by
//! asking a language model to call the TV tools.
//!
//! ## Exchange:
//! 1. Empty input short-circuits with "I didn't catch that" (history untouched)
//! 2. The system prompt is rendered from the current session state
//! 3. The utterance is appended to history as a user turn
//! 4. The model is called with the whole history and the tool set
//! 5. The full response is appended as an assistant turn, even without tool calls
//! 6. `tool_use` blocks become commands in model order; the text block is the reply
//!
//! If the model call fails, the user turn is rolled back and a neutral apology
//! is returned with no commands.

pub mod anthropic;
pub mod prompt;

pub use anthropic::AnthropicClient;

use crate::commands::{Command, ToolDefinition};
use crate::conversation::{ContentBlock, ConversationHistory, ConversationTurn};
use crate::error::AppResult;
use crate::session::SessionState;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

/// Reply used when there was nothing to interpret.
pub const NOTHING_HEARD_REPLY: &str = "I didn't catch that";

/// Reply used when the model answered with tool calls only.
pub const DEFAULT_REPLY: &str = "Done";

/// Reply used when the model could not be reached.
pub const FAILURE_REPLY: &str = "Sorry, I couldn't do that";

/// A chat model that can call tools.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send the system prompt, the conversation so far and the tool set;
    /// returns the response content blocks.
    async fn complete(
        &self,
        system: &str,
        turns: &[ConversationTurn],
        tools: &[ToolDefinition],
    ) -> AppResult<Vec<ContentBlock>>;
}

/// Result of interpreting one utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentOutcome {
    pub reply: String,
    pub commands: Vec<Command>,
}

impl IntentOutcome {
    fn reply_only(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            commands: Vec::new(),
        }
    }
}

/// Interpret `text` against the current session state (see module docs).
pub async fn extract_intent(
    model: &dyn LanguageModel,
    history: &mut ConversationHistory,
    system_prompt_template: &str,
    state: &SessionState,
    tools: &[ToolDefinition],
    text: &str,
) -> IntentOutcome {
    if text.trim().is_empty() {
        return IntentOutcome::reply_only(NOTHING_HEARD_REPLY);
    }

    let system = prompt::render_system_prompt(system_prompt_template, state);
    history.push(ConversationTurn::user(text));

    let blocks = match model.complete(&system, &history.turns(), tools).await {
        Ok(blocks) => blocks,
        Err(err) => {
            error!("Intent extraction failed: {}", err);
            history.pop_last();
            return IntentOutcome::reply_only(FAILURE_REPLY);
        }
    };

    let mut commands = Vec::new();
    let mut reply = None;

    for block in &blocks {
        match block {
            ContentBlock::ToolUse { name, input, .. } => match Command::from_tool_call(name, input) {
                Ok(command) => {
                    info!(command = ?command, "Command");
                    commands.push(command);
                }
                Err(err) => warn!("Dropping tool call: {}", err),
            },
            ContentBlock::Text { text } => reply = Some(text.clone()),
            ContentBlock::Other => {}
        }
    }

    history.push(ConversationTurn::assistant(blocks));

    IntentOutcome {
        reply: reply
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REPLY.to_string()),
        commands,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::commands::{tool_definitions, PlaybackAction, VolumeAction};
    use crate::error::AppError;
    use crate::intent::prompt::SYSTEM_PROMPT_TEMPLATE;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned responses and records every system prompt it was given.
    pub(crate) struct ScriptedModel {
        responses: Mutex<Vec<AppResult<Vec<ContentBlock>>>>,
        pub prompts: Mutex<Vec<String>>,
        pub calls: Mutex<Vec<Vec<ConversationTurn>>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(mut responses: Vec<AppResult<Vec<ContentBlock>>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(
            &self,
            system: &str,
            turns: &[ConversationTurn],
            _tools: &[ToolDefinition],
        ) -> AppResult<Vec<ContentBlock>> {
            self.prompts.lock().unwrap().push(system.to_string());
            self.calls.lock().unwrap().push(turns.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(AppError::Upstream("no scripted response".to_string())))
        }
    }

    pub(crate) fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    pub(crate) fn text(text: &str) -> ContentBlock {
        ContentBlock::Text { text: text.to_string() }
    }

    async fn run(model: &ScriptedModel, history: &mut ConversationHistory, utterance: &str) -> IntentOutcome {
        extract_intent(
            model,
            history,
            SYSTEM_PROMPT_TEMPLATE,
            &SessionState::default(),
            &tool_definitions(),
            utterance,
        )
        .await
    }

    #[tokio::test]
    async fn test_empty_text_short_circuits() {
        let model = ScriptedModel::new(vec![]);
        let mut history = ConversationHistory::new(20);

        for utterance in ["", "   \n\t"] {
            let outcome = run(&model, &mut history, utterance).await;
            assert_eq!(outcome.reply, NOTHING_HEARD_REPLY);
            assert!(outcome.commands.is_empty());
        }

        assert!(history.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pause_scenario() {
        let model = ScriptedModel::new(vec![Ok(vec![
            tool_use("toolu_1", "playback_control", json!({"action": "pause"})),
            text("Paused"),
        ])]);
        let mut history = ConversationHistory::new(20);

        let outcome = run(&model, &mut history, "pause").await;
        assert_eq!(outcome.reply, "Paused");
        assert_eq!(
            outcome.commands,
            vec![Command::PlaybackControl { action: PlaybackAction::Pause }]
        );

        let turns = history.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], ConversationTurn::user("pause"));
        assert_eq!(turns[1].tool_use_ids(), vec!["toolu_1"]);
    }

    #[tokio::test]
    async fn test_multiple_tool_calls_keep_model_order() {
        let model = ScriptedModel::new(vec![Ok(vec![
            tool_use("toolu_1", "launch_app", json!({"app": "netflix"})),
            tool_use("toolu_2", "volume_control", json!({"action": "up", "steps": 3})),
        ])]);
        let mut history = ConversationHistory::new(20);

        let outcome = run(&model, &mut history, "open netflix and turn it up").await;
        assert_eq!(outcome.reply, DEFAULT_REPLY);
        assert_eq!(
            outcome.commands,
            vec![
                Command::LaunchApp { app: "netflix".to_string() },
                Command::VolumeControl { action: VolumeAction::Up, level: None, steps: Some(3) },
            ]
        );
    }

    #[tokio::test]
    async fn test_text_only_reply_still_recorded() {
        let model = ScriptedModel::new(vec![Ok(vec![text("It's on channel 4")])]);
        let mut history = ConversationHistory::new(20);

        let outcome = run(&model, &mut history, "what's on").await;
        assert_eq!(outcome.reply, "It's on channel 4");
        assert!(outcome.commands.is_empty());
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_tool_call_is_dropped() {
        let model = ScriptedModel::new(vec![Ok(vec![
            tool_use("toolu_1", "self_destruct", json!({})),
            tool_use("toolu_2", "type_text", json!({"text": "dune"})),
        ])]);
        let mut history = ConversationHistory::new(20);

        let outcome = run(&model, &mut history, "type dune").await;
        assert_eq!(outcome.commands, vec![Command::TypeText { text: "dune".to_string() }]);
    }

    #[tokio::test]
    async fn test_model_failure_rolls_back_history() {
        let model = ScriptedModel::new(vec![Err(AppError::Upstream("timeout".to_string()))]);
        let mut history = ConversationHistory::new(20);

        let outcome = run(&model, &mut history, "pause").await;
        assert_eq!(outcome.reply, FAILURE_REPLY);
        assert!(outcome.commands.is_empty());
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_reflects_session_state() {
        let model = ScriptedModel::new(vec![Ok(vec![text("Ok")])]);
        let mut history = ConversationHistory::new(20);
        let mut state = SessionState::default();
        state.volume = 80;

        extract_intent(&model, &mut history, SYSTEM_PROMPT_TEMPLATE, &state, &tool_definitions(), "hi").await;

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("- Volume: 80"));
    }

    #[tokio::test]
    async fn test_history_window_applies_to_model_calls() {
        let responses = (0..15).map(|_| Ok(vec![text("Ok")])).collect();
        let model = ScriptedModel::new(responses);
        let mut history = ConversationHistory::new(20);

        for i in 0..15 {
            run(&model, &mut history, &format!("utterance {}", i)).await;
        }

        assert_eq!(history.len(), 20);
        let calls = model.calls.lock().unwrap();
        assert!(calls.iter().all(|turns| turns.len() <= 20));
    }
}
