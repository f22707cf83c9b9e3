//! Plugin-side runtime for deckbridge.
//!
//! The host launches a plugin process with registration parameters on the
//! command line. This crate opens the WebSocket back to the host, registers,
//! decodes host events and dispatches them to listeners, correlates "get"
//! requests with their replies, and routes instance events to per-action
//! handlers.

mod action;
mod commands;
mod connection;
mod correlator;
mod deferred;
mod error;
mod listeners;
mod plugin;
mod router;
mod tracking;

pub use action::{
    ActionEvent, ActionHandle, DialDownEvent, DialRotateEvent, DialUpEvent,
    DidReceiveSettingsEvent, KeyDownEvent, KeyUpEvent, PropertyInspectorEvent, SendToPluginEvent,
    TitleParametersDidChangeEvent, TouchTapEvent, WillAppearEvent, WillDisappearEvent,
};
pub use commands::Commands;
pub use connection::Connection;
pub use correlator::Correlator;
pub use deferred::{Completion, Resolver, deferred};
pub use error::{ClientError, PluginError};
pub use listeners::{Listener, ListenerId};
pub use plugin::Plugin;
pub use router::{ActionHandler, Router};
pub use tracking::{Device, DeviceRegistry, VisibleActions};
