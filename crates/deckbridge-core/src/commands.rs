//! Outbound commands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a plugin can send the host, tagged by `event`.
///
/// `context` is an instance context for instance commands and the plugin
/// UUID for plugin-wide ones (`getGlobalSettings`, `setGlobalSettings`,
/// `switchToProfile`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundMessage {
    SetTitle {
        context: String,
        payload: TitlePayload,
    },
    SetImage {
        context: String,
        payload: ImagePayload,
    },
    SetState {
        context: String,
        payload: StatePayload,
    },
    /// Layout-defined values, keyed by layout item.
    SetFeedback {
        context: String,
        payload: Value,
    },
    SetFeedbackLayout {
        context: String,
        payload: FeedbackLayoutPayload,
    },
    SetTriggerDescription {
        context: String,
        payload: TriggerDescription,
    },
    ShowAlert {
        context: String,
    },
    ShowOk {
        context: String,
    },
    GetSettings {
        context: String,
    },
    SetSettings {
        context: String,
        payload: Value,
    },
    GetGlobalSettings {
        context: String,
    },
    SetGlobalSettings {
        context: String,
        payload: Value,
    },
    SwitchToProfile {
        context: String,
        device: String,
        payload: ProfilePayload,
    },
    SendToPropertyInspector {
        context: String,
        payload: Value,
    },
    OpenUrl {
        payload: UrlPayload,
    },
    LogMessage {
        payload: LogPayload,
    },
}

impl OutboundMessage {
    /// The wire `event` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundMessage::SetTitle { .. } => "setTitle",
            OutboundMessage::SetImage { .. } => "setImage",
            OutboundMessage::SetState { .. } => "setState",
            OutboundMessage::SetFeedback { .. } => "setFeedback",
            OutboundMessage::SetFeedbackLayout { .. } => "setFeedbackLayout",
            OutboundMessage::SetTriggerDescription { .. } => "setTriggerDescription",
            OutboundMessage::ShowAlert { .. } => "showAlert",
            OutboundMessage::ShowOk { .. } => "showOk",
            OutboundMessage::GetSettings { .. } => "getSettings",
            OutboundMessage::SetSettings { .. } => "setSettings",
            OutboundMessage::GetGlobalSettings { .. } => "getGlobalSettings",
            OutboundMessage::SetGlobalSettings { .. } => "setGlobalSettings",
            OutboundMessage::SwitchToProfile { .. } => "switchToProfile",
            OutboundMessage::SendToPropertyInspector { .. } => "sendToPropertyInspector",
            OutboundMessage::OpenUrl { .. } => "openUrl",
            OutboundMessage::LogMessage { .. } => "logMessage",
        }
    }
}

/// Which surface a title or image applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Target {
    #[default]
    HardwareAndSoftware,
    Hardware,
    Software,
}

impl From<Target> for u8 {
    fn from(target: Target) -> Self {
        match target {
            Target::HardwareAndSoftware => 0,
            Target::Hardware => 1,
            Target::Software => 2,
        }
    }
}

impl TryFrom<u8> for Target {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Target::HardwareAndSoftware),
            1 => Ok(Target::Hardware),
            2 => Ok(Target::Software),
            other => Err(format!("invalid target: {other}")),
        }
    }
}

/// `title: None` restores the user-configured title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitlePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
}

/// `image` is a data URL or SVG markup; `None` restores the manifest image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
    pub state: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackLayoutPayload {
    /// Built-in layout id or path to a layout file.
    pub layout: String,
}

/// Hints shown for an encoder's interactions. Unset entries restore the
/// manifest text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_touch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePayload {
    /// `None` switches back to the previous profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPayload {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(message: &OutboundMessage) -> Value {
        serde_json::to_value(message).unwrap()
    }

    #[test]
    fn get_global_settings_frame() {
        let message = OutboundMessage::GetGlobalSettings {
            context: "abc123".into(),
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"event":"getGlobalSettings","context":"abc123"}"#
        );
    }

    #[test]
    fn set_title_omits_unset_fields() {
        let message = OutboundMessage::SetTitle {
            context: "ctx".into(),
            payload: TitlePayload {
                title: Some("Hi".into()),
                ..Default::default()
            },
        };
        assert_eq!(
            wire(&message),
            json!({"event": "setTitle", "context": "ctx", "payload": {"title": "Hi"}})
        );
    }

    #[test]
    fn target_is_numeric() {
        let message = OutboundMessage::SetImage {
            context: "ctx".into(),
            payload: ImagePayload {
                image: None,
                state: Some(1),
                target: Some(Target::Software),
            },
        };
        assert_eq!(wire(&message)["payload"], json!({"state": 1, "target": 2}));
        assert!(serde_json::from_value::<Target>(json!(9)).is_err());
    }

    #[test]
    fn event_name_matches_tag() {
        let messages = [
            OutboundMessage::ShowOk { context: "c".into() },
            OutboundMessage::OpenUrl {
                payload: UrlPayload { url: "https://example.com".into() },
            },
            OutboundMessage::SwitchToProfile {
                context: "p".into(),
                device: "d".into(),
                payload: ProfilePayload::default(),
            },
            OutboundMessage::SetTriggerDescription {
                context: "c".into(),
                payload: TriggerDescription {
                    rotate: Some("Volume".into()),
                    ..Default::default()
                },
            },
        ];
        for message in &messages {
            assert_eq!(wire(message)["event"], message.event_name());
        }
    }
}
