//! # Relay Context
//!
//! The one piece of process-wide state: what the TV is doing, who is connected,
//! and the conversation so far. A single `RelayContext` is created at startup and
//! handed to every connection actor as `web::Data<RelayContext>`.
//!
//! ## Locking:
//! actix-web runs several worker threads, so every mutable field is guarded.
//! - `session`, `phones` and `tv` use `std::sync::RwLock`; these locks are only
//!   held for a copy or an assignment and never across an `.await`
//! - `history` uses `tokio::sync::Mutex` and is held for a whole intent exchange,
//!   so one utterance's user and assistant turns are never interleaved with
//!   another utterance's

use crate::commands::{tool_definitions, Command, ToolDefinition};
use crate::config::AppConfig;
use crate::conversation::ConversationHistory;
use crate::error::AppResult;
use crate::intent::{AnthropicClient, LanguageModel};
use crate::session::SessionState;
use crate::transcription::{GroqTranscriber, Transcriber};
use crate::websocket::tv::{TvCommand, TvSocket};

use actix::Addr;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The currently registered TV peer.
#[derive(Clone)]
pub struct TvHandle {
    pub connection_id: Uuid,
    pub addr: Addr<TvSocket>,
}

/// Shared relay state and collaborators.
pub struct RelayContext {
    pub config: AppConfig,

    /// Believed TV status; written by the TV peer, read for prompts
    session: RwLock<SessionState>,

    /// Conversation sent to the language model
    pub history: Mutex<ConversationHistory>,

    /// Connected phone peers
    phones: RwLock<HashSet<Uuid>>,

    /// At most one TV peer; last connection wins
    tv: RwLock<Option<TvHandle>>,

    pub transcriber: Arc<dyn Transcriber>,
    pub model: Arc<dyn LanguageModel>,
    pub tools: Vec<ToolDefinition>,

    pub start_time: Instant,
}

impl RelayContext {
    /// Build a context around explicit collaborators.
    pub fn new(config: AppConfig, transcriber: Arc<dyn Transcriber>, model: Arc<dyn LanguageModel>) -> Self {
        let history = ConversationHistory::new(config.relay.history_limit);

        Self {
            config,
            session: RwLock::new(SessionState::default()),
            history: Mutex::new(history),
            phones: RwLock::new(HashSet::new()),
            tv: RwLock::new(None),
            transcriber,
            model,
            tools: tool_definitions(),
            start_time: Instant::now(),
        }
    }

    /// Build a context with the real remote clients from configuration.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let transcriber = Arc::new(GroqTranscriber::new(config.transcription.clone())?);
        let model = Arc::new(AnthropicClient::new(config.intent.clone())?);
        Ok(Self::new(config, transcriber, model))
    }

    /// Copy of the current session state.
    pub fn session_snapshot(&self) -> SessionState {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Merge a TV state update; returns the keys that were applied.
    pub fn merge_session(&self, update: &Map<String, Value>) -> Vec<&'static str> {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let applied = session.merge(update);
        debug!(state = ?*session, applied = ?applied, "TV state updated");
        applied
    }

    pub fn register_phone(&self, connection_id: Uuid) {
        let mut phones = self.phones.write().unwrap_or_else(PoisonError::into_inner);
        phones.insert(connection_id);
        info!(connection_id = %connection_id, phones = phones.len(), "Phone connected");
    }

    pub fn unregister_phone(&self, connection_id: Uuid) {
        let mut phones = self.phones.write().unwrap_or_else(PoisonError::into_inner);
        phones.remove(&connection_id);
        info!(connection_id = %connection_id, phones = phones.len(), "Phone disconnected");
    }

    pub fn phone_count(&self) -> usize {
        self.phones.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Make `addr` the TV peer, displacing any previous one.
    pub fn attach_tv(&self, connection_id: Uuid, addr: Addr<TvSocket>) {
        let mut tv = self.tv.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = tv.as_ref() {
            warn!(
                previous = %previous.connection_id,
                current = %connection_id,
                "New TV connection replaces the previous one"
            );
        }
        *tv = Some(TvHandle { connection_id, addr });
        info!(connection_id = %connection_id, "TV platform connected");
    }

    /// Clear the TV handle if it still belongs to `connection_id`.
    ///
    /// Returns whether the handle was cleared.
    pub fn detach_tv(&self, connection_id: Uuid) -> bool {
        let mut tv = self.tv.write().unwrap_or_else(PoisonError::into_inner);
        match tv.as_ref() {
            Some(handle) if handle.connection_id == connection_id => {
                *tv = None;
                info!(connection_id = %connection_id, "TV platform disconnected");
                true
            }
            _ => {
                info!(connection_id = %connection_id, "Displaced TV connection closed");
                false
            }
        }
    }

    pub fn tv_connected(&self) -> bool {
        self.tv.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Forward commands to the TV peer, one frame each, in order.
    ///
    /// Without a TV peer this logs a warning and does nothing. Never blocks:
    /// commands are queued on the TV actor's mailbox. Returns how many were queued.
    pub fn forward_to_tv(&self, commands: &[Command]) -> usize {
        if commands.is_empty() {
            return 0;
        }

        let handle = self.tv.read().unwrap_or_else(PoisonError::into_inner).clone();
        match handle {
            Some(handle) => {
                for command in commands {
                    handle.addr.do_send(TvCommand(command.clone()));
                }
                debug!(count = commands.len(), tv = %handle.connection_id, "Forwarded commands to TV");
                commands.len()
            }
            None => {
                warn!(count = commands.len(), "TV not connected, cannot send commands");
                0
            }
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
