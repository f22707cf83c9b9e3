//! Core types for deckbridge.
//!
//! This crate provides the protocol primitives exchanged between a plugin
//! process and its host: the registration parameters handed over on the
//! command line, the envelope every frame shares, the typed inbound event
//! union, the typed outbound command union and the plugin manifest. It does
//! no networking; `deckbridge-client` owns the transport.

mod commands;
mod envelope;
mod events;
mod manifest;
mod registration;

pub use commands::{
    FeedbackLayoutPayload, ImagePayload, LogPayload, OutboundMessage, ProfilePayload,
    StatePayload, Target, TitlePayload, TriggerDescription, UrlPayload,
};
pub use envelope::{Envelope, RegistrationFrame};
pub use events::{
    ActionTarget, AppearancePayload, ApplicationPayload, Controller, Coordinates, DeepLinkPayload,
    DeviceConnected, DeviceDisconnected, DeviceInfo, DeviceSize, DialPayload, DialRotatePayload,
    EventKind, GlobalSettingsPayload, InboundEvent, InstanceEvent, InstanceNotice, KeyPayload,
    SettingsPayload, TitleParameters, TitleParametersPayload, TouchTapPayload, UnknownEventKind,
};
pub use manifest::{Manifest, ManifestAction, ManifestError};
pub use registration::{
    ApplicationInfo, PluginInfo, RegisteredDevice, RegistrationError, RegistrationInfo,
    RegistrationParameters,
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport not opened yet.
    Unconnected,
    /// Transport opening, or open with the registration frame sent.
    Connecting,
    /// The host has started delivering protocol events.
    Ready,
    /// Socket closed or errored. Terminal.
    Closed,
}
