use crate::health;
use crate::websocket;
use actix_web::web;

/// Route table shared by the server and the tests.
///
/// `/status` is the only explicit route; everything else, including `/` and
/// `/health`, goes through the WebSocket router so upgrades can be classified by path.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(health::relay_status))
        .default_service(web::to(websocket::accept));
}
