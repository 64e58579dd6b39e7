//! Inbound WebSocket message types for both peer roles.

use crate::commands::{Command, Direction, PlaybackAction};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Text frames a phone may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhoneMessage {
    /// The next binary frame is a recorded utterance
    Audio {
        /// Whatever else the phone attached (mime type, duration, ...)
        #[serde(flatten)]
        metadata: Map<String, Value>,
    },

    /// D-pad press from the on-screen remote
    Navigate { direction: Direction },

    /// Transport button from the on-screen remote
    Playback { action: PlaybackAction },
}

impl PhoneMessage {
    /// The command a manual-control message maps to, if any.
    pub fn direct_command(&self) -> Option<Command> {
        match self {
            PhoneMessage::Audio { .. } => None,
            PhoneMessage::Navigate { direction } => Some(Command::Navigate {
                direction: *direction,
                repeat: None,
            }),
            PhoneMessage::Playback { action } => Some(Command::PlaybackControl { action: *action }),
        }
    }
}

/// Text frames the TV platform may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TvMessage {
    /// Partial update of the TV status
    StateUpdate {
        #[serde(default)]
        state: Map<String, Value>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audio_message_keeps_metadata() {
        let msg: PhoneMessage =
            serde_json::from_str(r#"{"type":"audio","mime":"audio/webm","duration_ms":1800}"#).unwrap();
        match msg {
            PhoneMessage::Audio { metadata } => {
                assert_eq!(metadata.get("mime"), Some(&json!("audio/webm")));
                assert_eq!(metadata.get("duration_ms"), Some(&json!(1800)));
                assert!(!metadata.contains_key("type"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_manual_controls_map_to_commands() {
        let nav: PhoneMessage = serde_json::from_str(r#"{"type":"navigate","direction":"up"}"#).unwrap();
        assert_eq!(
            nav.direct_command(),
            Some(Command::Navigate { direction: Direction::Up, repeat: None })
        );

        let playback: PhoneMessage = serde_json::from_str(r#"{"type":"playback","action":"rewind"}"#).unwrap();
        assert_eq!(
            playback.direct_command(),
            Some(Command::PlaybackControl { action: PlaybackAction::Rewind })
        );
    }

    #[test]
    fn test_malformed_phone_messages_fail_to_parse() {
        assert!(serde_json::from_str::<PhoneMessage>(r#"{"type":"navigate"}"#).is_err());
        assert!(serde_json::from_str::<PhoneMessage>(r#"{"type":"navigate","direction":"sideways"}"#).is_err());
        assert!(serde_json::from_str::<PhoneMessage>(r#"{"type":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<PhoneMessage>("not json").is_err());
    }

    #[test]
    fn test_state_update_parsing() {
        let msg: TvMessage = serde_json::from_str(r#"{"type":"state_update","state":{"volume":80}}"#).unwrap();
        assert_eq!(
            msg,
            TvMessage::StateUpdate { state: json!({"volume": 80}).as_object().cloned().unwrap() }
        );

        let empty: TvMessage = serde_json::from_str(r#"{"type":"state_update"}"#).unwrap();
        assert_eq!(empty, TvMessage::StateUpdate { state: Map::new() });
    }
}
