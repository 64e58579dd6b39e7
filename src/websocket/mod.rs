//! # WebSocket Router
//!
//! Every request the explicit routes don't claim lands here. Plain HTTP requests
//! get the liveness answer or a 404; WebSocket upgrades are classified once by
//! path and handed to the matching actor for the life of the connection.
//!
//! ## Paths:
//! - `/` and `/voice`: phone peers ([`phone::PhoneSocket`])
//! - `/tv`: the TV platform ([`tv::TvSocket`])
//! - anything else: closed immediately with 1003 "Unknown path"

pub mod heartbeat;
pub mod messages;
pub mod phone;
pub mod tv;

use crate::error::AppError;
use crate::health;
use crate::state::RelayContext;

use actix::prelude::*;
use actix_web::{http::header, web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use tracing::{info, warn};

/// Role of a WebSocket peer, decided by its request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    Phone,
    Tv,
}

impl PeerRole {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" | "/voice" => Some(PeerRole::Phone),
            "/tv" => Some(PeerRole::Tv),
            _ => None,
        }
    }
}

/// Whether the request asks to be upgraded to a WebSocket.
pub fn is_websocket_upgrade(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Completes the handshake and immediately closes with "Unknown path".
struct RejectedSocket;

impl Actor for RejectedSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Unsupported,
            description: Some("Unknown path".to_string()),
        }));
        ctx.stop();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RejectedSocket {
    fn handle(&mut self, _msg: Result<ws::Message, ws::ProtocolError>, _ctx: &mut Self::Context) {}
}

/// Default service: liveness for plain HTTP, role dispatch for upgrades.
pub async fn accept(
    req: HttpRequest,
    stream: web::Payload,
    relay: web::Data<RelayContext>,
) -> ActixResult<HttpResponse> {
    let path = req.path().to_string();

    if !is_websocket_upgrade(&req) {
        if req.method() == actix_web::http::Method::GET && (path == "/" || path == "/health") {
            return Ok(health::liveness().await);
        }
        return Err(AppError::NotFound(format!("No route for {} {}", req.method(), path)).into());
    }

    let max_frame_bytes = relay.config.server.max_frame_bytes;
    let peer = req.connection_info().peer_addr().map(str::to_string);

    match PeerRole::from_path(&path) {
        Some(PeerRole::Phone) => {
            info!(path = %path, peer = ?peer, "Phone connecting");
            ws::WsResponseBuilder::new(phone::PhoneSocket::new(relay), &req, stream)
                .frame_size(max_frame_bytes)
                .start()
        }
        Some(PeerRole::Tv) => {
            info!(peer = ?peer, "TV platform connecting");
            ws::WsResponseBuilder::new(tv::TvSocket::new(relay), &req, stream)
                .frame_size(max_frame_bytes)
                .start()
        }
        None => {
            warn!(path = %path, peer = ?peer, "Rejecting connection to unknown path");
            ws::start(RejectedSocket, &req, stream)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_role_from_path() {
        assert_eq!(PeerRole::from_path("/"), Some(PeerRole::Phone));
        assert_eq!(PeerRole::from_path("/voice"), Some(PeerRole::Phone));
        assert_eq!(PeerRole::from_path("/tv"), Some(PeerRole::Tv));
        assert_eq!(PeerRole::from_path("/tv/extra"), None);
        assert_eq!(PeerRole::from_path("/health"), None);
        assert_eq!(PeerRole::from_path("/unknown"), None);
    }

    #[test]
    fn test_upgrade_detection() {
        let upgrade = TestRequest::get()
            .insert_header((header::UPGRADE, "WebSocket"))
            .to_http_request();
        assert!(is_websocket_upgrade(&upgrade));

        let plain = TestRequest::get().to_http_request();
        assert!(!is_websocket_upgrade(&plain));

        let h2c = TestRequest::get().insert_header((header::UPGRADE, "h2c")).to_http_request();
        assert!(!is_websocket_upgrade(&h2c));
    }
}
