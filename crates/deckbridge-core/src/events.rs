//! Inbound events.
//!
//! [`InboundEvent`] is the closed union of everything the host sends a
//! plugin, tagged by `event`. [`EventKind`] is the bare tag, used as the
//! subscription key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Event names the host delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    DidReceiveSettings,
    DidReceiveGlobalSettings,
    DidReceiveDeepLink,
    KeyDown,
    KeyUp,
    TouchTap,
    DialDown,
    DialUp,
    DialRotate,
    WillAppear,
    WillDisappear,
    TitleParametersDidChange,
    DeviceDidConnect,
    DeviceDidDisconnect,
    ApplicationDidLaunch,
    ApplicationDidTerminate,
    SystemDidWakeUp,
    PropertyInspectorDidAppear,
    PropertyInspectorDidDisappear,
    SendToPlugin,
}

impl EventKind {
    pub const ALL: [EventKind; 20] = [
        EventKind::DidReceiveSettings,
        EventKind::DidReceiveGlobalSettings,
        EventKind::DidReceiveDeepLink,
        EventKind::KeyDown,
        EventKind::KeyUp,
        EventKind::TouchTap,
        EventKind::DialDown,
        EventKind::DialUp,
        EventKind::DialRotate,
        EventKind::WillAppear,
        EventKind::WillDisappear,
        EventKind::TitleParametersDidChange,
        EventKind::DeviceDidConnect,
        EventKind::DeviceDidDisconnect,
        EventKind::ApplicationDidLaunch,
        EventKind::ApplicationDidTerminate,
        EventKind::SystemDidWakeUp,
        EventKind::PropertyInspectorDidAppear,
        EventKind::PropertyInspectorDidDisappear,
        EventKind::SendToPlugin,
    ];

    /// The wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DidReceiveSettings => "didReceiveSettings",
            EventKind::DidReceiveGlobalSettings => "didReceiveGlobalSettings",
            EventKind::DidReceiveDeepLink => "didReceiveDeepLink",
            EventKind::KeyDown => "keyDown",
            EventKind::KeyUp => "keyUp",
            EventKind::TouchTap => "touchTap",
            EventKind::DialDown => "dialDown",
            EventKind::DialUp => "dialUp",
            EventKind::DialRotate => "dialRotate",
            EventKind::WillAppear => "willAppear",
            EventKind::WillDisappear => "willDisappear",
            EventKind::TitleParametersDidChange => "titleParametersDidChange",
            EventKind::DeviceDidConnect => "deviceDidConnect",
            EventKind::DeviceDidDisconnect => "deviceDidDisconnect",
            EventKind::ApplicationDidLaunch => "applicationDidLaunch",
            EventKind::ApplicationDidTerminate => "applicationDidTerminate",
            EventKind::SystemDidWakeUp => "systemDidWakeUp",
            EventKind::PropertyInspectorDidAppear => "propertyInspectorDidAppear",
            EventKind::PropertyInspectorDidDisappear => "propertyInspectorDidDisappear",
            EventKind::SendToPlugin => "sendToPlugin",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// An `event` value outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event: {0}")]
pub struct UnknownEventKind(pub String);

/// Everything the host can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum InboundEvent {
    DidReceiveSettings(InstanceEvent<SettingsPayload>),
    DidReceiveGlobalSettings { payload: GlobalSettingsPayload },
    DidReceiveDeepLink { payload: DeepLinkPayload },
    KeyDown(InstanceEvent<KeyPayload>),
    KeyUp(InstanceEvent<KeyPayload>),
    TouchTap(InstanceEvent<TouchTapPayload>),
    DialDown(InstanceEvent<DialPayload>),
    DialUp(InstanceEvent<DialPayload>),
    DialRotate(InstanceEvent<DialRotatePayload>),
    WillAppear(InstanceEvent<AppearancePayload>),
    WillDisappear(InstanceEvent<AppearancePayload>),
    TitleParametersDidChange(InstanceEvent<TitleParametersPayload>),
    DeviceDidConnect(DeviceConnected),
    DeviceDidDisconnect(DeviceDisconnected),
    ApplicationDidLaunch { payload: ApplicationPayload },
    ApplicationDidTerminate { payload: ApplicationPayload },
    SystemDidWakeUp {},
    PropertyInspectorDidAppear(InstanceNotice),
    PropertyInspectorDidDisappear(InstanceNotice),
    SendToPlugin(InstanceEvent<Value>),
}

impl InboundEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::DidReceiveSettings(_) => EventKind::DidReceiveSettings,
            InboundEvent::DidReceiveGlobalSettings { .. } => EventKind::DidReceiveGlobalSettings,
            InboundEvent::DidReceiveDeepLink { .. } => EventKind::DidReceiveDeepLink,
            InboundEvent::KeyDown(_) => EventKind::KeyDown,
            InboundEvent::KeyUp(_) => EventKind::KeyUp,
            InboundEvent::TouchTap(_) => EventKind::TouchTap,
            InboundEvent::DialDown(_) => EventKind::DialDown,
            InboundEvent::DialUp(_) => EventKind::DialUp,
            InboundEvent::DialRotate(_) => EventKind::DialRotate,
            InboundEvent::WillAppear(_) => EventKind::WillAppear,
            InboundEvent::WillDisappear(_) => EventKind::WillDisappear,
            InboundEvent::TitleParametersDidChange(_) => EventKind::TitleParametersDidChange,
            InboundEvent::DeviceDidConnect(_) => EventKind::DeviceDidConnect,
            InboundEvent::DeviceDidDisconnect(_) => EventKind::DeviceDidDisconnect,
            InboundEvent::ApplicationDidLaunch { .. } => EventKind::ApplicationDidLaunch,
            InboundEvent::ApplicationDidTerminate { .. } => EventKind::ApplicationDidTerminate,
            InboundEvent::SystemDidWakeUp {} => EventKind::SystemDidWakeUp,
            InboundEvent::PropertyInspectorDidAppear(_) => EventKind::PropertyInspectorDidAppear,
            InboundEvent::PropertyInspectorDidDisappear(_) => {
                EventKind::PropertyInspectorDidDisappear
            }
            InboundEvent::SendToPlugin(_) => EventKind::SendToPlugin,
        }
    }

    /// The instance an event is scoped to, if any.
    pub fn target(&self) -> Option<&ActionTarget> {
        match self {
            InboundEvent::DidReceiveSettings(e) => Some(&e.target),
            InboundEvent::KeyDown(e) | InboundEvent::KeyUp(e) => Some(&e.target),
            InboundEvent::TouchTap(e) => Some(&e.target),
            InboundEvent::DialDown(e) | InboundEvent::DialUp(e) => Some(&e.target),
            InboundEvent::DialRotate(e) => Some(&e.target),
            InboundEvent::WillAppear(e) | InboundEvent::WillDisappear(e) => Some(&e.target),
            InboundEvent::TitleParametersDidChange(e) => Some(&e.target),
            InboundEvent::PropertyInspectorDidAppear(e)
            | InboundEvent::PropertyInspectorDidDisappear(e) => Some(&e.target),
            InboundEvent::SendToPlugin(e) => Some(&e.target),
            InboundEvent::DidReceiveGlobalSettings { .. }
            | InboundEvent::DidReceiveDeepLink { .. }
            | InboundEvent::DeviceDidConnect(_)
            | InboundEvent::DeviceDidDisconnect(_)
            | InboundEvent::ApplicationDidLaunch { .. }
            | InboundEvent::ApplicationDidTerminate { .. }
            | InboundEvent::SystemDidWakeUp {} => None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        self.target().map(|t| t.context.as_str())
    }

    /// Manifest action id of the instance this event is about.
    pub fn action_id(&self) -> Option<&str> {
        self.target().map(|t| t.action.as_str())
    }
}

/// Addressing carried by instance-scoped events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionTarget {
    /// Manifest action id.
    pub action: String,
    /// Instance context.
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// An instance-scoped event with a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceEvent<P> {
    #[serde(flatten)]
    pub target: ActionTarget,
    pub payload: P,
}

/// An instance-scoped event with no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceNotice {
    #[serde(flatten)]
    pub target: ActionTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub column: u32,
    pub row: u32,
}

/// Kind of physical control an instance sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    Keypad,
    Encoder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppearancePayload {
    #[serde(default)]
    pub settings: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Controller>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u8>,
    #[serde(default)]
    pub is_in_multi_action: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPayload {
    #[serde(default)]
    pub settings: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_desired_state: Option<u8>,
    #[serde(default)]
    pub is_in_multi_action: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialPayload {
    #[serde(default)]
    pub settings: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Controller>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialRotatePayload {
    #[serde(default)]
    pub settings: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Signed detent count; negative is counter-clockwise.
    pub ticks: i32,
    #[serde(default)]
    pub pressed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchTapPayload {
    #[serde(default)]
    pub settings: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Touch position in pixels, `[x, y]`.
    pub tap_pos: [u32; 2],
    #[serde(default)]
    pub hold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPayload {
    #[serde(default)]
    pub settings: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Controller>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u8>,
    #[serde(default)]
    pub is_in_multi_action: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleParametersPayload {
    #[serde(default)]
    pub settings: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u8>,
    #[serde(default)]
    pub title: String,
    pub title_parameters: TitleParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TitleParameters {
    pub font_family: String,
    pub font_size: u32,
    pub font_style: String,
    pub font_underline: bool,
    pub show_title: bool,
    pub title_alignment: String,
    pub title_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettingsPayload {
    #[serde(default)]
    pub settings: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLinkPayload {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationPayload {
    pub application: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConnected {
    pub device: String,
    pub device_info: DeviceInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDisconnected {
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub name: String,
    pub size: DeviceSize,
    /// Host-defined hardware model number.
    #[serde(rename = "type", default)]
    pub kind: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSize {
    pub columns: u32,
    pub rows: u32,
}
