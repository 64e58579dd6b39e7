//! # TV Session State
//!
//! The relay's belief about what the TV is doing right now. It is written only by
//! `state_update` messages from the TV peer and read when the language-model prompt
//! is built. It lives for the whole process and survives TV reconnects.
//!
//! ## Partial merge:
//! A state update carries any subset of the known keys. Keys we do not model are
//! dropped, known keys overwrite the current value, and values of the wrong shape
//! are skipped so one bad field cannot corrupt the rest of the update.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Whether the TV is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => write!(f, "on"),
            PowerState::Off => write!(f, "off"),
        }
    }
}

/// Snapshot of the TV status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub power: PowerState,
    /// Foreground app identifier, e.g. "home", "netflix"
    pub app: String,
    /// 0-100
    pub volume: u8,
    pub now_playing: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            power: PowerState::On,
            app: "home".to_string(),
            volume: 50,
            now_playing: None,
        }
    }
}

impl SessionState {
    /// Merge a TV state update into this snapshot.
    ///
    /// Returns the keys that were applied, in the order they were seen.
    pub fn merge(&mut self, update: &Map<String, Value>) -> Vec<&'static str> {
        let mut applied = Vec::new();

        for (key, value) in update {
            let accepted = match key.as_str() {
                "power" => match serde_json::from_value::<PowerState>(value.clone()) {
                    Ok(power) => {
                        self.power = power;
                        Some("power")
                    }
                    Err(_) => None,
                },
                "app" => value.as_str().map(|app| {
                    self.app = app.to_string();
                    "app"
                }),
                "volume" => value.as_u64().map(|volume| {
                    self.volume = volume.min(100) as u8;
                    "volume"
                }),
                "now_playing" => match value {
                    Value::Null => {
                        self.now_playing = None;
                        Some("now_playing")
                    }
                    Value::String(title) => {
                        self.now_playing = Some(title.clone());
                        Some("now_playing")
                    }
                    _ => None,
                },
                // Not part of the model
                _ => continue,
            };

            match accepted {
                Some(key) => applied.push(key),
                None => warn!(key = %key, value = %value, "Ignoring ill-typed TV state value"),
            }
        }

        applied
    }
}
