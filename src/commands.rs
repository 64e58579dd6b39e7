//! # TV Commands
//!
//! The fixed vocabulary of actions the TV platform understands. The same verbs are
//! offered to the language model as tools, so a tool call decodes straight into a
//! [`Command`].
//!
//! ## Wire shape:
//! A command is a JSON object tagged by `type`:
//! ```json
//! {"type": "volume_control", "action": "set", "level": 30}
//! ```
//! When forwarded to the TV it is wrapped as `{"type":"command", ...}` (see
//! [`Command::to_tv_frame`]).

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// D-pad directions plus the select/back/home keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackAction {
    Play,
    Pause,
    Stop,
    SkipForward,
    SkipBackward,
    Rewind,
    FastForward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeAction {
    Up,
    Down,
    Mute,
    Unmute,
    Set,
}

/// What kind of title a search is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Movie,
    Series,
    #[default]
    Any,
}

/// A structured instruction for the TV platform.
///
/// ## Optional fields:
/// Optional parameters are omitted from the wire when absent, so a direct D-pad
/// press produces `{"type":"navigate","direction":"up"}` with no `repeat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Navigate {
        direction: Direction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repeat: Option<u32>,
    },
    PlaybackControl {
        action: PlaybackAction,
    },
    VolumeControl {
        action: VolumeAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        steps: Option<u32>,
    },
    LaunchApp {
        app: String,
    },
    SearchContent {
        query: String,
        /// Sent as `content_type`: `type` is taken by the tag.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<ContentType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service: Option<String>,
    },
    PlayContent {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service: Option<String>,
    },
    TypeText {
        text: String,
    },
}

impl Command {
    /// Decode a language-model tool call into a command.
    ///
    /// The tool name becomes the `type` tag and the tool input supplies the fields.
    /// `search_content` declares its own `type` parameter, which is moved to
    /// `content_type` before decoding.
    pub fn from_tool_call(name: &str, input: &Value) -> AppResult<Self> {
        let mut fields = match input {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(AppError::BadRequest(format!(
                    "tool '{}' input is not an object: {}",
                    name, other
                )))
            }
        };

        if let Some(kind) = fields.remove("type") {
            if name == "search_content" {
                fields.insert("content_type".to_string(), kind);
            }
        }
        fields.insert("type".to_string(), Value::String(name.to_string()));

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::BadRequest(format!("invalid '{}' tool call: {}", name, e)))
    }

    /// The command's verb, as used for the `type` tag and the tool name.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Navigate { .. } => "navigate",
            Command::PlaybackControl { .. } => "playback_control",
            Command::VolumeControl { .. } => "volume_control",
            Command::LaunchApp { .. } => "launch_app",
            Command::SearchContent { .. } => "search_content",
            Command::PlayContent { .. } => "play_content",
            Command::TypeText { .. } => "type_text",
        }
    }

    /// Render the frame sent to the TV peer.
    ///
    /// The envelope tag `"type":"command"` comes first and the command's own
    /// fields follow, including its own `type`; JSON readers that keep the last
    /// duplicate key see the command verb.
    pub fn to_tv_frame(&self) -> AppResult<String> {
        let body = serde_json::to_string(self)?;
        // An internally tagged enum always serializes to a non-empty object
        let fields = body
            .strip_prefix('{')
            .ok_or_else(|| AppError::Internal(format!("command did not serialize to an object: {}", body)))?;
        Ok(format!("{{\"type\":\"command\",{}", fields))
    }
}

/// A tool offered to the language model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The TV tool set, one tool per [`Command`] verb.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "navigate",
            description: "Navigate the TV interface with directional commands.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "direction": {
                        "type": "string",
                        "enum": ["up", "down", "left", "right", "select", "back", "home"]
                    },
                    "repeat": {"type": "integer", "default": 1}
                },
                "required": ["direction"]
            }),
        },
        ToolDefinition {
            name: "playback_control",
            description: "Control media playback (play, pause, stop, skip).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["play", "pause", "stop", "skip_forward", "skip_backward", "rewind", "fast_forward"]
                    }
                },
                "required": ["action"]
            }),
        },
        ToolDefinition {
            name: "volume_control",
            description: "Control TV volume.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string", "enum": ["up", "down", "mute", "unmute", "set"]},
                    "level": {"type": "integer", "minimum": 0, "maximum": 100},
                    "steps": {"type": "integer", "default": 1}
                },
                "required": ["action"]
            }),
        },
        ToolDefinition {
            name: "launch_app",
            description: "Launch a streaming app (netflix, hulu, disney_plus, youtube, etc.).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "app": {"type": "string"}
                },
                "required": ["app"]
            }),
        },
        ToolDefinition {
            name: "search_content",
            description: "Search for movies or TV shows to watch.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "type": {"type": "string", "enum": ["movie", "series", "any"], "default": "any"},
                    "service": {"type": "string"}
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "play_content",
            description: "Play a specific movie or show by name.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "service": {"type": "string"}
                },
                "required": ["title"]
            }),
        },
        ToolDefinition {
            name: "type_text",
            description: "Type text into the current text field (for search boxes).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string"}
                },
                "required": ["text"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_playback_tool_call() {
        let cmd = Command::from_tool_call("playback_control", &json!({"action": "pause"})).unwrap();
        assert_eq!(cmd, Command::PlaybackControl { action: PlaybackAction::Pause });
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"type": "playback_control", "action": "pause"})
        );
    }

    #[test]
    fn test_search_content_type_becomes_content_type() {
        let cmd = Command::from_tool_call(
            "search_content",
            &json!({"query": "space documentaries", "type": "series", "service": "netflix"}),
        )
        .unwrap();

        assert_eq!(
            cmd,
            Command::SearchContent {
                query: "space documentaries".to_string(),
                content_type: Some(ContentType::Series),
                service: Some("netflix".to_string()),
            }
        );
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({
                "type": "search_content",
                "query": "space documentaries",
                "content_type": "series",
                "service": "netflix"
            })
        );
    }

    #[test]
    fn test_stray_type_field_cannot_override_tool_name() {
        let cmd = Command::from_tool_call("launch_app", &json!({"app": "youtube", "type": "movie"})).unwrap();
        assert_eq!(cmd, Command::LaunchApp { app: "youtube".to_string() });
    }

    #[test]
    fn test_invalid_tool_calls_are_rejected() {
        assert!(Command::from_tool_call("reboot", &json!({})).is_err());
        assert!(Command::from_tool_call("navigate", &json!({"direction": "diagonal"})).is_err());
        assert!(Command::from_tool_call("launch_app", &json!({})).is_err());
        assert!(Command::from_tool_call("type_text", &json!("hello")).is_err());
    }

    #[test]
    fn test_optional_fields_omitted_on_wire() {
        let cmd = Command::Navigate { direction: Direction::Up, repeat: None };
        assert_eq!(serde_json::to_string(&cmd).unwrap(), r#"{"type":"navigate","direction":"up"}"#);

        let cmd = Command::from_tool_call("volume_control", &json!({"action": "set", "level": 30})).unwrap();
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"type": "volume_control", "action": "set", "level": 30})
        );
    }

    #[test]
    fn test_tv_frame_envelope() {
        let cmd = Command::PlaybackControl { action: PlaybackAction::Pause };
        assert_eq!(
            cmd.to_tv_frame().unwrap(),
            r#"{"type":"command","type":"playback_control","action":"pause"}"#
        );
    }

    #[test]
    fn test_every_tool_has_a_command() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 7);

        let samples = [
            ("navigate", json!({"direction": "home"})),
            ("playback_control", json!({"action": "play"})),
            ("volume_control", json!({"action": "mute"})),
            ("launch_app", json!({"app": "hulu"})),
            ("search_content", json!({"query": "dune"})),
            ("play_content", json!({"title": "Dune"})),
            ("type_text", json!({"text": "dune"})),
        ];
        for (tool, (name, input)) in tools.iter().zip(samples.iter()) {
            assert_eq!(tool.name, *name);
            let cmd = Command::from_tool_call(name, input).unwrap();
            assert_eq!(cmd.kind(), tool.name);
        }
    }
}
