//! Commands the plugin can issue to the host.

use crate::action::ActionHandle;
use crate::correlator::Correlator;
use crate::deferred::Completion;
use crate::{ClientError, Connection};
use deckbridge_core::{
    ActionTarget, EventKind, FeedbackLayoutPayload, ImagePayload, InboundEvent, LogPayload,
    OutboundMessage, ProfilePayload, StatePayload, TitlePayload, TriggerDescription, UrlPayload,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;

/// The command-issuing side of a plugin: one per process, shared by every
/// [`ActionHandle`].
///
/// Fire-and-forget commands are queued when called and return a completion
/// for the write; dropping it does not cancel the send. Requests (`get_*`)
/// are sent when called and resolve when the matching reply arrives.
#[derive(Clone, Debug)]
pub struct Commands {
    connection: Connection,
    correlator: Correlator,
    plugin_uuid: Arc<str>,
}

impl Commands {
    pub fn new(connection: Connection, plugin_uuid: &str) -> Self {
        Self {
            correlator: Correlator::new(connection.clone()),
            connection,
            plugin_uuid: Arc::from(plugin_uuid),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn plugin_uuid(&self) -> &str {
        &self.plugin_uuid
    }

    /// A handle scoped to one action instance.
    pub fn action(&self, target: ActionTarget) -> ActionHandle {
        ActionHandle::new(target, self.clone())
    }

    pub fn set_title(&self, context: &str, payload: TitlePayload) -> Completion<()> {
        self.connection.send(&OutboundMessage::SetTitle {
            context: context.to_string(),
            payload,
        })
    }

    pub fn set_image(&self, context: &str, payload: ImagePayload) -> Completion<()> {
        self.connection.send(&OutboundMessage::SetImage {
            context: context.to_string(),
            payload,
        })
    }

    pub fn set_state(&self, context: &str, state: u8) -> Completion<()> {
        self.connection.send(&OutboundMessage::SetState {
            context: context.to_string(),
            payload: StatePayload { state },
        })
    }

    pub fn set_feedback<T: Serialize>(&self, context: &str, feedback: &T) -> Completion<()> {
        match serde_json::to_value(feedback) {
            Ok(payload) => self.connection.send(&OutboundMessage::SetFeedback {
                context: context.to_string(),
                payload,
            }),
            Err(e) => Completion::failed(e.into()),
        }
    }

    pub fn set_feedback_layout(&self, context: &str, layout: &str) -> Completion<()> {
        self.connection.send(&OutboundMessage::SetFeedbackLayout {
            context: context.to_string(),
            payload: FeedbackLayoutPayload {
                layout: layout.to_string(),
            },
        })
    }

    pub fn set_trigger_description(
        &self,
        context: &str,
        description: TriggerDescription,
    ) -> Completion<()> {
        self.connection.send(&OutboundMessage::SetTriggerDescription {
            context: context.to_string(),
            payload: description,
        })
    }

    pub fn show_alert(&self, context: &str) -> Completion<()> {
        self.connection.send(&OutboundMessage::ShowAlert {
            context: context.to_string(),
        })
    }

    pub fn show_ok(&self, context: &str) -> Completion<()> {
        self.connection.send(&OutboundMessage::ShowOk {
            context: context.to_string(),
        })
    }

    /// Ask the host for an instance's settings.
    pub fn get_settings<T: DeserializeOwned>(
        &self,
        context: &str,
    ) -> impl Future<Output = Result<T, ClientError>> + Send + use<T> {
        let reply = self.correlator.request(
            &OutboundMessage::GetSettings {
                context: context.to_string(),
            },
            EventKind::DidReceiveSettings,
            Some(context),
        );
        async move {
            match reply.await? {
                InboundEvent::DidReceiveSettings(event) => {
                    Ok(serde_json::from_value(event.payload.settings)?)
                }
                other => Err(ClientError::UnexpectedReply(other.kind())),
            }
        }
    }

    pub fn set_settings<T: Serialize>(&self, context: &str, settings: &T) -> Completion<()> {
        match serde_json::to_value(settings) {
            Ok(payload) => self.connection.send(&OutboundMessage::SetSettings {
                context: context.to_string(),
                payload,
            }),
            Err(e) => Completion::failed(e.into()),
        }
    }

    /// Ask the host for the plugin-wide settings.
    pub fn get_global_settings<T: DeserializeOwned>(
        &self,
    ) -> impl Future<Output = Result<T, ClientError>> + Send + use<T> {
        let reply = self.correlator.request(
            &OutboundMessage::GetGlobalSettings {
                context: self.plugin_uuid.to_string(),
            },
            EventKind::DidReceiveGlobalSettings,
            None,
        );
        async move {
            match reply.await? {
                InboundEvent::DidReceiveGlobalSettings { payload } => {
                    Ok(serde_json::from_value(payload.settings)?)
                }
                other => Err(ClientError::UnexpectedReply(other.kind())),
            }
        }
    }

    pub fn set_global_settings<T: Serialize>(&self, settings: &T) -> Completion<()> {
        match serde_json::to_value(settings) {
            Ok(payload) => self.connection.send(&OutboundMessage::SetGlobalSettings {
                context: self.plugin_uuid.to_string(),
                payload,
            }),
            Err(e) => Completion::failed(e.into()),
        }
    }

    /// Switch `device` to a profile bundled with the plugin. `None` returns
    /// to the previous profile.
    pub fn switch_to_profile(
        &self,
        device: &str,
        profile: Option<&str>,
        page: Option<u32>,
    ) -> Completion<()> {
        self.connection.send(&OutboundMessage::SwitchToProfile {
            context: self.plugin_uuid.to_string(),
            device: device.to_string(),
            payload: ProfilePayload {
                profile: profile.map(str::to_string),
                page,
            },
        })
    }

    pub fn send_to_property_inspector<T: Serialize>(
        &self,
        context: &str,
        payload: &T,
    ) -> Completion<()> {
        match serde_json::to_value(payload) {
            Ok(payload) => self.connection.send(&OutboundMessage::SendToPropertyInspector {
                context: context.to_string(),
                payload,
            }),
            Err(e) => Completion::failed(e.into()),
        }
    }

    /// Open a URL in the user's default browser.
    pub fn open_url(&self, url: &str) -> Completion<()> {
        self.connection.send(&OutboundMessage::OpenUrl {
            payload: UrlPayload {
                url: url.to_string(),
            },
        })
    }

    /// Write a line to the host's log for this plugin.
    pub fn log_message(&self, message: &str) -> Completion<()> {
        self.connection.send(&OutboundMessage::LogMessage {
            payload: LogPayload {
                message: message.to_string(),
            },
        })
    }

    /// Correlated requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.correlator.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckbridge_core::RegistrationFrame;
    use serde::Deserialize;

    fn commands() -> Commands {
        let connection = Connection::with_endpoint(
            "ws://127.0.0.1:1",
            RegistrationFrame::new("registerPlugin", "abc123"),
        );
        Commands::new(connection, "abc123")
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[tokio::test]
    async fn global_settings_resolve_from_reply() {
        let commands = commands();
        let pending = commands.get_global_settings::<Named>();
        assert_eq!(commands.pending_requests(), 1);

        commands.connection().handle_text(
            r#"{"event":"didReceiveGlobalSettings","payload":{"settings":{"name":"Elgato"}}}"#,
        );

        assert_eq!(
            pending.await.unwrap(),
            Named {
                name: "Elgato".into()
            }
        );
    }

    #[tokio::test]
    async fn settings_with_wrong_shape_are_a_json_error() {
        let commands = commands();
        let pending = commands.get_settings::<Named>("ctx");

        commands.connection().handle_text(
            r#"{"event":"didReceiveSettings","action":"a","context":"ctx","payload":{"settings":{"count":1}}}"#,
        );

        assert!(matches!(pending.await, Err(ClientError::Json(_))));
    }
}
