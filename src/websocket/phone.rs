//! # Phone Connection
//!
//! Actor for a phone peer (any path other than `/tv`, `/health` and `/status`).
//!
//! ## Protocol:
//! 1. **Audio header**: `{"type":"audio", ...}` announces that the next binary frame is an utterance
//! 2. **Audio**: one binary frame of webm audio, answered with a `PhoneReply` JSON frame
//! 3. **Manual controls**: `{"type":"navigate","direction":...}` and
//!    `{"type":"playback","action":...}` go straight to the TV with no reply
//!
//! Utterances run on a detached task, so manual controls keep flowing while a
//! transcription or model call is in flight, and a phone that disconnects
//! mid-utterance does not cancel it: the commands still reach the TV and only
//! the reply is dropped.

use crate::pipeline::{process_audio, PhoneReply};
use crate::state::RelayContext;
use crate::websocket::heartbeat::{self, Heartbeat};
use crate::websocket::messages::PhoneMessage;

use actix::prelude::*;
use actix_web::web;
use actix_web_actors::ws;
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Finished utterance to send back to the phone.
#[derive(Message)]
#[rtype(result = "()")]
struct ReplyReady(PhoneReply);

/// Where a phone connection is in the audio exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum PhonePhase {
    Idle,
    /// An audio header arrived; the next binary frame is the utterance
    AwaitingAudio { metadata: Map<String, Value> },
}

pub struct PhoneSocket {
    connection_id: Uuid,
    relay: web::Data<RelayContext>,
    phase: PhonePhase,
    last_heartbeat: Instant,
}

impl PhoneSocket {
    pub fn new(relay: web::Data<RelayContext>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            relay,
            phase: PhonePhase::Idle,
            last_heartbeat: Instant::now(),
        }
    }

    fn handle_text(&mut self, text: &str) {
        let message = match serde_json::from_str::<PhoneMessage>(text) {
            Ok(message) => message,
            Err(err) => {
                warn!(connection_id = %self.connection_id, "Ignoring malformed phone message: {}", err);
                return;
            }
        };

        if let Some(command) = message.direct_command() {
            debug!(command = command.kind(), "Manual control from phone");
            self.relay.forward_to_tv(&[command]);
            return;
        }

        if let PhoneMessage::Audio { metadata } = message {
            debug!(connection_id = %self.connection_id, ?metadata, "Audio header received");
            self.phase = PhonePhase::AwaitingAudio { metadata };
        }
    }

    fn handle_binary(&mut self, data: &[u8], ctx: &mut ws::WebsocketContext<Self>) {
        match std::mem::replace(&mut self.phase, PhonePhase::Idle) {
            PhonePhase::Idle => {
                debug!(bytes = data.len(), "Binary frame without audio header, ignoring");
            }
            PhonePhase::AwaitingAudio { .. } => {
                let relay = self.relay.clone();
                let addr = ctx.address();
                let audio = data.to_vec();

                actix_web::rt::spawn(async move {
                    let reply = process_audio(&relay, &audio).await;
                    if addr.connected() {
                        addr.do_send(ReplyReady(reply));
                    } else {
                        debug!("Phone left before its reply was ready, dropping reply");
                    }
                });
            }
        }
    }
}

impl Heartbeat for PhoneSocket {
    fn last_heartbeat(&self) -> Instant {
        self.last_heartbeat
    }
}

impl Actor for PhoneSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.relay.register_phone(self.connection_id);

        let relay_config = &self.relay.config.relay;
        heartbeat::start(ctx, relay_config.ping_interval(), relay_config.ping_timeout());
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.relay.unregister_phone(self.connection_id);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PhoneSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => self.handle_text(&text),
            Ok(ws::Message::Binary(data)) => self.handle_binary(&data, ctx),
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!(connection_id = %self.connection_id, "Phone closed connection: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame from phone");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!(connection_id = %self.connection_id, "Phone WebSocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

impl Handler<ReplyReady> for PhoneSocket {
    type Result = ();

    fn handle(&mut self, msg: ReplyReady, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg.0) {
            Ok(json) => ctx.text(json),
            Err(err) => error!(connection_id = %self.connection_id, "Failed to encode phone reply: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::tests::ScriptedModel;
    use crate::state::tests::{test_context, FixedTranscriber};
    use std::sync::Arc;

    fn phone() -> PhoneSocket {
        let relay = test_context(Arc::new(FixedTranscriber::new("")), Arc::new(ScriptedModel::new(vec![])));
        PhoneSocket::new(web::Data::new(relay))
    }

    #[test]
    fn test_audio_header_arms_binary_frame() {
        let mut socket = phone();
        socket.handle_text(r#"{"type":"audio","mime":"audio/webm"}"#);

        match &socket.phase {
            PhonePhase::AwaitingAudio { metadata } => {
                assert_eq!(metadata.get("mime").and_then(Value::as_str), Some("audio/webm"));
            }
            other => panic!("unexpected phase: {:?}", other),
        }
    }

    #[test]
    fn test_manual_control_and_garbage_leave_phase_idle() {
        let mut socket = phone();
        socket.handle_text(r#"{"type":"navigate","direction":"left"}"#);
        socket.handle_text("{not json");
        socket.handle_text(r#"{"type":"state_update","state":{}}"#);
        assert_eq!(socket.phase, PhonePhase::Idle);
    }
}
