//! # TV Voice Relay - Main Application Entry Point
//!
//! A WebSocket relay between phones acting as voice remotes and a TV platform.
//! A phone records an utterance, the relay turns it into text (Groq Whisper) and
//! then into TV commands plus a spoken reply (Anthropic tool use), forwards the
//! commands to the TV, and answers the phone.
//!
//! ## Application Architecture:
//! - **config**: Layered configuration (defaults, `config.toml`, environment)
//! - **state**: The shared `RelayContext` injected into every connection
//! - **session / conversation**: Believed TV status and the model's conversation
//! - **commands**: The closed set of TV commands and the tools offered to the model
//! - **transcription / intent**: Remote speech-to-text and intent extraction
//! - **pipeline**: One utterance, end to end
//! - **websocket**: Path routing plus the phone and TV connection actors
//! - **health / middleware / routes**: The plain HTTP surface and request logging
//! - **error**: Custom error types and HTTP error responses

mod commands;
mod config;
mod conversation;
mod error;
mod health;
mod intent;
mod middleware;
mod pipeline;
mod routes;
mod session;
mod state;
mod transcription;
mod websocket;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use crate::state::RelayContext;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Loads configuration, builds the relay context and runs the server until
/// SIGINT/SIGTERM. actix-web stops accepting connections on the signal and
/// gives open connections its shutdown timeout to finish.
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting tv-voice-relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        transcription_model = %config.transcription.model,
        intent_model = %config.intent.model,
        "Configuration loaded: {}:{}",
        config.server.host,
        config.server.port
    );

    if !config.has_transcription_key() {
        warn!("GROQ_API_KEY not set, every utterance will be answered with the not-heard reply");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let relay = web::Data::new(RelayContext::from_config(config)?);

    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(relay.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::RequestLogging)
            .configure(routes::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter `tv_voice_relay=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tv_voice_relay=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
