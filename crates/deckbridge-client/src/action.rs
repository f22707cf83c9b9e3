//! Instance handles and the events that carry them.

use crate::commands::Commands;
use crate::deferred::Completion;
use crate::ClientError;
use deckbridge_core::{
    ActionTarget, AppearancePayload, DialPayload, DialRotatePayload, EventKind, ImagePayload,
    KeyPayload, SettingsPayload, TitleParametersPayload, TitlePayload, TouchTapPayload,
    TriggerDescription,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

/// One on-screen instance of a manifest action, with the instance commands
/// pre-bound to its context.
///
/// Handles are plain values built per event delivery. Two handles for the
/// same instance compare equal.
#[derive(Clone)]
pub struct ActionHandle {
    target: ActionTarget,
    commands: Commands,
}

impl std::fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandle")
            .field("action", &self.target.action)
            .field("context", &self.target.context)
            .field("device", &self.target.device)
            .finish()
    }
}

impl PartialEq for ActionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl Eq for ActionHandle {}

impl ActionHandle {
    pub fn new(target: ActionTarget, commands: Commands) -> Self {
        Self { target, commands }
    }

    /// Manifest action id.
    pub fn id(&self) -> &str {
        &self.target.action
    }

    /// Instance context.
    pub fn context(&self) -> &str {
        &self.target.context
    }

    pub fn device(&self) -> Option<&str> {
        self.target.device.as_deref()
    }

    pub fn target(&self) -> &ActionTarget {
        &self.target
    }

    pub fn set_title(&self, title: impl Into<String>) -> Completion<()> {
        self.set_title_with(TitlePayload {
            title: Some(title.into()),
            ..Default::default()
        })
    }

    /// Full control over state and target. A default payload restores the
    /// user's title.
    pub fn set_title_with(&self, payload: TitlePayload) -> Completion<()> {
        self.commands.set_title(self.context(), payload)
    }

    pub fn set_image(&self, image: impl Into<String>) -> Completion<()> {
        self.set_image_with(ImagePayload {
            image: Some(image.into()),
            ..Default::default()
        })
    }

    pub fn set_image_with(&self, payload: ImagePayload) -> Completion<()> {
        self.commands.set_image(self.context(), payload)
    }

    pub fn set_state(&self, state: u8) -> Completion<()> {
        self.commands.set_state(self.context(), state)
    }

    pub fn set_feedback<T: Serialize>(&self, feedback: &T) -> Completion<()> {
        self.commands.set_feedback(self.context(), feedback)
    }

    pub fn set_feedback_layout(&self, layout: &str) -> Completion<()> {
        self.commands.set_feedback_layout(self.context(), layout)
    }

    pub fn set_trigger_description(&self, description: TriggerDescription) -> Completion<()> {
        self.commands.set_trigger_description(self.context(), description)
    }

    pub fn show_alert(&self) -> Completion<()> {
        self.commands.show_alert(self.context())
    }

    pub fn show_ok(&self) -> Completion<()> {
        self.commands.show_ok(self.context())
    }

    pub fn get_settings<T: DeserializeOwned>(
        &self,
    ) -> impl Future<Output = Result<T, ClientError>> + Send + use<T> {
        self.commands.get_settings(self.context())
    }

    pub fn set_settings<T: Serialize>(&self, settings: &T) -> Completion<()> {
        self.commands.set_settings(self.context(), settings)
    }

    pub fn send_to_property_inspector<T: Serialize>(&self, payload: &T) -> Completion<()> {
        self.commands
            .send_to_property_inspector(self.context(), payload)
    }
}

/// An instance-scoped event as handlers see it.
#[derive(Debug, Clone)]
pub struct ActionEvent<P> {
    /// The original event name.
    pub kind: EventKind,
    pub action: ActionHandle,
    pub payload: P,
}

impl<P> ActionEvent<P> {
    pub(crate) fn new(kind: EventKind, target: ActionTarget, payload: P, commands: &Commands) -> Self {
        Self {
            kind,
            action: commands.action(target),
            payload,
        }
    }
}

pub type WillAppearEvent = ActionEvent<AppearancePayload>;
pub type WillDisappearEvent = ActionEvent<AppearancePayload>;
pub type KeyDownEvent = ActionEvent<KeyPayload>;
pub type KeyUpEvent = ActionEvent<KeyPayload>;
pub type DialDownEvent = ActionEvent<DialPayload>;
pub type DialUpEvent = ActionEvent<DialPayload>;
pub type DialRotateEvent = ActionEvent<DialRotatePayload>;
pub type TouchTapEvent = ActionEvent<TouchTapPayload>;
pub type DidReceiveSettingsEvent = ActionEvent<SettingsPayload>;
pub type TitleParametersDidChangeEvent = ActionEvent<TitleParametersPayload>;
pub type PropertyInspectorEvent = ActionEvent<()>;
pub type SendToPluginEvent = ActionEvent<Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Connection;
    use deckbridge_core::RegistrationFrame;

    fn target(context: &str) -> ActionTarget {
        ActionTarget {
            action: "com.example.counter".into(),
            context: context.into(),
            device: Some("dev".into()),
        }
    }

    fn commands() -> Commands {
        let connection = Connection::with_endpoint(
            "ws://127.0.0.1:1",
            RegistrationFrame::new("registerPlugin", "plugin"),
        );
        Commands::new(connection, "plugin")
    }

    #[test]
    fn handles_for_the_same_instance_are_equal() {
        let commands = commands();
        let a = commands.action(target("ctx"));
        let b = commands.action(target("ctx"));
        let c = commands.action(target("other"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.id(), "com.example.counter");
        assert_eq!(a.context(), "ctx");
        assert_eq!(a.device(), Some("dev"));
    }

    #[tokio::test]
    async fn handle_settings_request_is_bound_to_its_context() {
        let commands = commands();
        let handle = commands.action(target("ctx"));
        let pending = handle.get_settings::<serde_json::Value>();

        commands.connection().handle_text(
            r#"{"event":"didReceiveSettings","action":"com.example.counter","context":"ctx","payload":{"settings":{"count":7}}}"#,
        );

        assert_eq!(pending.await.unwrap()["count"], 7);
    }
}
