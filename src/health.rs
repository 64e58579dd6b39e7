use crate::state::RelayContext;
use actix_web::{http::header::ContentType, web, HttpResponse};
use serde_json::json;

/// Plain-text liveness answer for probes that don't speak WebSocket.
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::plaintext()).body("OK")
}

/// Relay overview for operators.
///
/// The history lock is held for a whole model round trip, so `history_len` is
/// `null` while an utterance is being interpreted instead of waiting for it.
pub async fn relay_status(relay: web::Data<RelayContext>) -> HttpResponse {
    let history_len = relay.history.try_lock().ok().map(|history| history.len());

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": relay.uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "tv_connected": relay.tv_connected(),
        "phones_connected": relay.phone_count(),
        "state": relay.session_snapshot(),
        "history_len": history_len
    }))
}
