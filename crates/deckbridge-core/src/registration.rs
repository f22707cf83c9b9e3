//! Registration parameters.
//!
//! The host launches a plugin with four flag/value pairs:
//!
//! ```text
//! plugin -port 28196 -pluginUUID <uuid> -registerEvent registerPlugin -info '<json>'
//! ```
//!
//! All four are required; a plugin that cannot read them cannot connect.

use crate::events::DeviceInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the host hands the plugin at launch. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationParameters {
    /// Local port the host listens on.
    pub port: u16,
    /// Identifier this plugin instance registers under.
    pub plugin_uuid: String,
    /// Event name of the registration frame.
    pub register_event: String,
    /// Host, plugin and device metadata.
    pub info: RegistrationInfo,
}

impl RegistrationParameters {
    pub const PORT_FLAG: &'static str = "-port";
    pub const UUID_FLAG: &'static str = "-pluginUUID";
    pub const REGISTER_EVENT_FLAG: &'static str = "-registerEvent";
    pub const INFO_FLAG: &'static str = "-info";

    /// Parse from the process argument vector (or any list of arguments).
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, RegistrationError> {
        let port = flag_value(args, Self::PORT_FLAG)
            .ok_or(RegistrationError::MissingArgument(Self::PORT_FLAG))?;
        let port = port
            .parse()
            .map_err(|_| RegistrationError::InvalidPort(port.to_string()))?;

        let plugin_uuid = flag_value(args, Self::UUID_FLAG)
            .ok_or(RegistrationError::MissingArgument(Self::UUID_FLAG))?
            .to_string();
        let register_event = flag_value(args, Self::REGISTER_EVENT_FLAG)
            .ok_or(RegistrationError::MissingArgument(Self::REGISTER_EVENT_FLAG))?
            .to_string();
        let info = flag_value(args, Self::INFO_FLAG)
            .ok_or(RegistrationError::MissingArgument(Self::INFO_FLAG))?;
        let info = serde_json::from_str(info).map_err(RegistrationError::InvalidInfo)?;

        Ok(Self {
            port,
            plugin_uuid,
            register_event,
            info,
        })
    }

    /// Parse from `std::env::args()`.
    pub fn from_env() -> Result<Self, RegistrationError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    /// WebSocket endpoint the host listens on.
    pub fn endpoint(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }
}

fn flag_value<'a, S: AsRef<str>>(args: &'a [S], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a.as_ref() == flag)
        .and_then(|i| args.get(i + 1))
        .map(AsRef::as_ref)
}

/// Decoded `-info` argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationInfo {
    #[serde(default)]
    pub application: ApplicationInfo,
    #[serde(default)]
    pub plugin: PluginInfo,
    #[serde(default = "default_pixel_ratio")]
    pub device_pixel_ratio: u32,
    /// Host theme colours, keyed by role.
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default)]
    pub devices: Vec<RegisteredDevice>,
}

fn default_pixel_ratio() -> u32 {
    1
}

/// The host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    #[serde(default)]
    pub font: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub platform_version: String,
    #[serde(default)]
    pub version: String,
}

/// The plugin as the host knows it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub version: String,
}

/// A device that was already connected when the plugin launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredDevice {
    pub id: String,
    #[serde(flatten)]
    pub info: DeviceInfo,
}

/// Error reading registration parameters. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("missing required argument {0}")]
    MissingArgument(&'static str),
    #[error("port must be a number between 0 and 65535, got: {0}")]
    InvalidPort(String),
    #[error("invalid -info payload: {0}")]
    InvalidInfo(#[source] serde_json::Error),
}
