//! # Utterance Pipeline
//!
//! What happens to one recorded utterance from a phone:
//! transcribe → extract intent → forward commands to the TV → build the reply.
//!
//! Every step recovers locally, so the phone always gets a reply.

use crate::commands::Command;
use crate::intent::{extract_intent, prompt::SYSTEM_PROMPT_TEMPLATE};
use crate::state::RelayContext;

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Reply frame sent back to the phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneReply {
    /// Text for the phone to speak
    pub tts_response: String,
    pub commands: Vec<Command>,
    /// What the speech-to-text service heard ("" if nothing)
    pub transcription: String,
}

/// Run one utterance through the relay.
pub async fn process_audio(relay: &RelayContext, audio: &[u8]) -> PhoneReply {
    let start_time = Instant::now();
    info!(bytes = audio.len(), "Received audio");

    let transcription = relay.transcriber.transcribe(audio).await;

    let state = relay.session_snapshot();
    let outcome = {
        let mut history = relay.history.lock().await;
        extract_intent(
            relay.model.as_ref(),
            &mut history,
            SYSTEM_PROMPT_TEMPLATE,
            &state,
            &relay.tools,
            &transcription,
        )
        .await
    };

    if !outcome.commands.is_empty() {
        relay.forward_to_tv(&outcome.commands);
    }

    info!(
        commands = outcome.commands.len(),
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Utterance processed: '{}'",
        outcome.reply
    );

    PhoneReply {
        tts_response: outcome.reply,
        commands: outcome.commands,
        transcription,
    }
}
