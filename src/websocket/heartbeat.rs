//! Protocol-level liveness checks shared by the phone and TV actors.
//!
//! Every `interval` the actor sends a WebSocket ping. If neither a pong nor a
//! ping arrives from the peer within `timeout` of that ping, the peer is presumed
//! dead and the actor stops.

use actix::{Actor, ActorContext, AsyncContext};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tracing::warn;

/// Implemented by actors that track when they last heard a ping or pong.
pub trait Heartbeat {
    fn last_heartbeat(&self) -> Instant;
}

/// Start the ping loop for `ctx`.
pub fn start<A>(ctx: &mut ws::WebsocketContext<A>, interval: Duration, timeout: Duration)
where
    A: Actor<Context = ws::WebsocketContext<A>> + Heartbeat,
{
    ctx.run_interval(interval, move |_act, ctx| {
        let ping_sent_at = Instant::now();
        ctx.ping(b"");

        ctx.run_later(timeout, move |act, ctx| {
            if act.last_heartbeat() < ping_sent_at {
                warn!(timeout_secs = timeout.as_secs(), "WebSocket heartbeat timeout, closing connection");
                ctx.stop();
            }
        });
    });
}
