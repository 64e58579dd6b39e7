//! # Configuration Management
//!
//! Loads relay configuration from several sources, highest priority first:
//! 1. Platform variables (`PORT`, `HOST`) and provider credentials
//!    (`GROQ_API_KEY`, `ANTHROPIC_API_KEY`, `CLAUDE_MODEL`)
//! 2. Environment variables with the `APP_` prefix, `__` between levels
//!    (e.g. `APP_SERVER__PORT=9000`, `APP_RELAY__HISTORY_LIMIT=10`)
//! 3. An optional `config.toml` in the working directory
//! 4. Built-in defaults (the `Default` impl below)
//!
//! ## Why `__` as the separator:
//! Field names such as `api_key` or `history_limit` already contain underscores,
//! so a single `_` could not tell nesting apart from the field name.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Groq's OpenAI-compatible Whisper endpoint.
pub const GROQ_TRANSCRIPTION_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";

/// Anthropic messages endpoint.
pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Top-level relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transcription: TranscriptionConfig,
    pub intent: IntentConfig,
    pub relay: RelayConfig,
}

/// Listener settings.
///
/// ## Fields:
/// - `host`: Address to bind; `0.0.0.0` so phones on the LAN can reach us
/// - `port`: One port serves the phone endpoint, the TV endpoint and the probes
/// - `max_frame_bytes`: Largest inbound WebSocket frame; audio arrives as one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_frame_bytes: usize,
}

/// Remote speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub api_url: String,
    pub model: String,
    pub language: String,
    pub timeout_secs: u64,
    /// Without a key every transcription comes back empty.
    pub api_key: Option<String>,
}

/// Remote language-model settings used for intent extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Required: the relay refuses to start without it.
    pub api_key: Option<String>,
}

/// Session relay tuning.
///
/// ## Fields:
/// - `history_limit`: Conversation turns kept for the language model (oldest dropped first)
/// - `ping_interval_secs`: How often each peer is pinged
/// - `ping_timeout_secs`: How long after a ping a peer may stay silent before it is dropped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub history_limit: usize,
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8765,
                max_frame_bytes: 1024 * 1024,
            },
            transcription: TranscriptionConfig {
                api_url: GROQ_TRANSCRIPTION_URL.to_string(),
                model: "whisper-large-v3".to_string(),
                language: "en".to_string(),
                timeout_secs: 30,
                api_key: None,
            },
            intent: IntentConfig {
                api_url: ANTHROPIC_MESSAGES_URL.to_string(),
                model: "claude-sonnet-4-20250514".to_string(),
                max_tokens: 512,
                timeout_secs: 30,
                api_key: None,
            },
            relay: RelayConfig {
                history_limit: 20,
                ping_interval_secs: 30,
                ping_timeout_secs: 10,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `config.toml`, and the environment.
    ///
    /// ## Environment Variable Examples:
    /// - `PORT=10000`: Port assigned by the hosting platform
    /// - `GROQ_API_KEY=gsk_...`: Speech-to-text credential
    /// - `ANTHROPIC_API_KEY=sk-ant-...`: Language-model credential
    /// - `CLAUDE_MODEL=claude-...`: Override the intent model
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Variables that deployment platforms and the provider SDKs use by convention
        let overrides = [
            ("HOST", "server.host"),
            ("PORT", "server.port"),
            ("GROQ_API_KEY", "transcription.api_key"),
            ("ANTHROPIC_API_KEY", "intent.api_key"),
            ("CLAUDE_MODEL", "intent.model"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = env::var(var) {
                settings = settings.set_override(key, value)?;
            }
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Reject configurations the relay cannot run with.
    ///
    /// A missing language-model key is fatal: starting without it would accept
    /// phone connections and then fail every utterance.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.server.max_frame_bytes == 0 {
            return Err(anyhow::anyhow!("Max frame size must be greater than 0"));
        }

        if self.intent.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(anyhow::anyhow!(
                "ANTHROPIC_API_KEY is not set; intent extraction cannot work without it"
            ));
        }

        if self.transcription.timeout_secs == 0 || self.intent.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Remote call timeouts must be greater than 0"));
        }

        if self.relay.history_limit == 0 {
            return Err(anyhow::anyhow!("History limit must be greater than 0"));
        }

        if self.relay.ping_interval_secs == 0 || self.relay.ping_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Ping interval and timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Whether speech-to-text has a credential; checked once at startup for a warning.
    pub fn has_transcription_key(&self) -> bool {
        self.transcription
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

impl TranscriptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl IntentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RelayConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}
