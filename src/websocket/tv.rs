//! # TV Platform Connection
//!
//! Actor for the single TV peer on `/tv`.
//!
//! ## Protocol:
//! - **TV → relay**: `{"type":"state_update","state":{...}}`, merged into the session state
//! - **relay → TV**: one `{"type":"command", ...}` text frame per command
//!
//! On start the actor registers itself as the TV handle, replacing any earlier TV.
//! On stop it clears the handle, unless a newer TV has already taken over.

use crate::commands::Command;
use crate::state::RelayContext;
use crate::websocket::heartbeat::{self, Heartbeat};
use crate::websocket::messages::TvMessage;

use actix::prelude::*;
use actix_web::web;
use actix_web_actors::ws;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A command to deliver to the TV peer.
#[derive(Message)]
#[rtype(result = "()")]
pub struct TvCommand(pub Command);

pub struct TvSocket {
    connection_id: Uuid,
    relay: web::Data<RelayContext>,
    last_heartbeat: Instant,
}

impl TvSocket {
    pub fn new(relay: web::Data<RelayContext>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            relay,
            last_heartbeat: Instant::now(),
        }
    }

    fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<TvMessage>(text) {
            Ok(TvMessage::StateUpdate { state }) => {
                self.relay.merge_session(&state);
            }
            Err(err) => {
                warn!(connection_id = %self.connection_id, "Ignoring malformed TV message: {}", err);
            }
        }
    }
}

impl Heartbeat for TvSocket {
    fn last_heartbeat(&self) -> Instant {
        self.last_heartbeat
    }
}

impl Actor for TvSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.relay.attach_tv(self.connection_id, ctx.address());

        let relay_config = &self.relay.config.relay;
        heartbeat::start(ctx, relay_config.ping_interval(), relay_config.ping_timeout());
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.relay.detach_tv(self.connection_id);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for TvSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => self.handle_text(&text),
            Ok(ws::Message::Binary(data)) => {
                warn!(bytes = data.len(), "Ignoring binary frame from TV");
            }
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!(connection_id = %self.connection_id, "TV closed connection: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame from TV");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!(connection_id = %self.connection_id, "TV WebSocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

impl Handler<TvCommand> for TvSocket {
    type Result = ();

    fn handle(&mut self, msg: TvCommand, ctx: &mut Self::Context) {
        match msg.0.to_tv_frame() {
            Ok(frame) => {
                debug!(command = msg.0.kind(), "Sending command to TV");
                ctx.text(frame);
            }
            Err(err) => error!("Failed to encode TV command: {}", err),
        }
    }
}
