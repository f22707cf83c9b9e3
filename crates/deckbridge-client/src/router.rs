//! Routing instance events to per-action handlers.
//!
//! A route binds one manifest action id to an [`ActionHandler`]. For every
//! hook the handler sets, the router installs one connection listener that
//! only passes events whose action id equals the route's. Hooks left unset
//! get no listener at all.
//!
//! ```rust,ignore
//! plugin.route(
//!     "com.example.counter.increment",
//!     ActionHandler::new()
//!         .on_will_appear(|ev| { ev.action.set_title("0"); })
//!         .on_key_down(|ev| { ev.action.show_ok(); }),
//! );
//! ```

use crate::action::{
    ActionEvent, DialDownEvent, DialRotateEvent, DialUpEvent, DidReceiveSettingsEvent,
    KeyDownEvent, KeyUpEvent, PropertyInspectorEvent, SendToPluginEvent,
    TitleParametersDidChangeEvent, TouchTapEvent, WillAppearEvent, WillDisappearEvent,
};
use crate::commands::Commands;
use crate::listeners::ListenerId;
use deckbridge_core::{EventKind, InboundEvent, Manifest};
use std::sync::{Arc, Mutex, PoisonError};

type Hook<P> = Arc<dyn Fn(ActionEvent<P>) + Send + Sync>;

/// The set of hooks one action type responds to.
#[derive(Default, Clone)]
pub struct ActionHandler {
    will_appear: Option<Hook<deckbridge_core::AppearancePayload>>,
    will_disappear: Option<Hook<deckbridge_core::AppearancePayload>>,
    key_down: Option<Hook<deckbridge_core::KeyPayload>>,
    key_up: Option<Hook<deckbridge_core::KeyPayload>>,
    dial_down: Option<Hook<deckbridge_core::DialPayload>>,
    dial_up: Option<Hook<deckbridge_core::DialPayload>>,
    dial_rotate: Option<Hook<deckbridge_core::DialRotatePayload>>,
    touch_tap: Option<Hook<deckbridge_core::TouchTapPayload>>,
    did_receive_settings: Option<Hook<deckbridge_core::SettingsPayload>>,
    title_parameters_did_change: Option<Hook<deckbridge_core::TitleParametersPayload>>,
    property_inspector_did_appear: Option<Hook<()>>,
    property_inspector_did_disappear: Option<Hook<()>>,
    send_to_plugin: Option<Hook<serde_json::Value>>,
}

impl std::fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandler")
            .field("hooks", &self.hooks())
            .finish()
    }
}

impl ActionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_will_appear(mut self, f: impl Fn(WillAppearEvent) + Send + Sync + 'static) -> Self {
        self.will_appear = Some(Arc::new(f));
        self
    }

    pub fn on_will_disappear(
        mut self,
        f: impl Fn(WillDisappearEvent) + Send + Sync + 'static,
    ) -> Self {
        self.will_disappear = Some(Arc::new(f));
        self
    }

    pub fn on_key_down(mut self, f: impl Fn(KeyDownEvent) + Send + Sync + 'static) -> Self {
        self.key_down = Some(Arc::new(f));
        self
    }

    pub fn on_key_up(mut self, f: impl Fn(KeyUpEvent) + Send + Sync + 'static) -> Self {
        self.key_up = Some(Arc::new(f));
        self
    }

    pub fn on_dial_down(mut self, f: impl Fn(DialDownEvent) + Send + Sync + 'static) -> Self {
        self.dial_down = Some(Arc::new(f));
        self
    }

    pub fn on_dial_up(mut self, f: impl Fn(DialUpEvent) + Send + Sync + 'static) -> Self {
        self.dial_up = Some(Arc::new(f));
        self
    }

    pub fn on_dial_rotate(mut self, f: impl Fn(DialRotateEvent) + Send + Sync + 'static) -> Self {
        self.dial_rotate = Some(Arc::new(f));
        self
    }

    pub fn on_touch_tap(mut self, f: impl Fn(TouchTapEvent) + Send + Sync + 'static) -> Self {
        self.touch_tap = Some(Arc::new(f));
        self
    }

    pub fn on_did_receive_settings(
        mut self,
        f: impl Fn(DidReceiveSettingsEvent) + Send + Sync + 'static,
    ) -> Self {
        self.did_receive_settings = Some(Arc::new(f));
        self
    }

    pub fn on_title_parameters_did_change(
        mut self,
        f: impl Fn(TitleParametersDidChangeEvent) + Send + Sync + 'static,
    ) -> Self {
        self.title_parameters_did_change = Some(Arc::new(f));
        self
    }

    pub fn on_property_inspector_did_appear(
        mut self,
        f: impl Fn(PropertyInspectorEvent) + Send + Sync + 'static,
    ) -> Self {
        self.property_inspector_did_appear = Some(Arc::new(f));
        self
    }

    pub fn on_property_inspector_did_disappear(
        mut self,
        f: impl Fn(PropertyInspectorEvent) + Send + Sync + 'static,
    ) -> Self {
        self.property_inspector_did_disappear = Some(Arc::new(f));
        self
    }

    pub fn on_send_to_plugin(
        mut self,
        f: impl Fn(SendToPluginEvent) + Send + Sync + 'static,
    ) -> Self {
        self.send_to_plugin = Some(Arc::new(f));
        self
    }

    /// Event kinds this handler has a hook for.
    pub fn hooks(&self) -> Vec<EventKind> {
        [
            (self.will_appear.is_some(), EventKind::WillAppear),
            (self.will_disappear.is_some(), EventKind::WillDisappear),
            (self.key_down.is_some(), EventKind::KeyDown),
            (self.key_up.is_some(), EventKind::KeyUp),
            (self.dial_down.is_some(), EventKind::DialDown),
            (self.dial_up.is_some(), EventKind::DialUp),
            (self.dial_rotate.is_some(), EventKind::DialRotate),
            (self.touch_tap.is_some(), EventKind::TouchTap),
            (self.did_receive_settings.is_some(), EventKind::DidReceiveSettings),
            (
                self.title_parameters_did_change.is_some(),
                EventKind::TitleParametersDidChange,
            ),
            (
                self.property_inspector_did_appear.is_some(),
                EventKind::PropertyInspectorDidAppear,
            ),
            (
                self.property_inspector_did_disappear.is_some(),
                EventKind::PropertyInspectorDidDisappear,
            ),
            (self.send_to_plugin.is_some(), EventKind::SendToPlugin),
        ]
        .into_iter()
        .filter_map(|(set, kind)| set.then_some(kind))
        .collect()
    }
}

struct Route {
    action_id: String,
    listeners: Vec<(EventKind, ListenerId)>,
}

/// Binds manifest action ids to handlers over the shared connection.
///
/// Routes are permanent. Several routes may name the same action id; their
/// hooks fire in registration order.
pub struct Router {
    commands: Commands,
    manifest: Arc<Manifest>,
    routes: Mutex<Vec<Route>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Router")
            .field(
                "routes",
                &routes.iter().map(|r| r.action_id.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Install a filtered listener for one hook whose event carries a payload.
macro_rules! wire {
    ($self:ident, $listeners:ident, $action_id:ident, $hook:expr, $variant:ident) => {
        if let Some(hook) = $hook {
            let commands = $self.commands.clone();
            let action_id = $action_id.to_string();
            let id = $self
                .commands
                .connection()
                .on(EventKind::$variant, move |event| {
                    if let InboundEvent::$variant(instance) = event {
                        if instance.target.action == action_id {
                            hook(ActionEvent::new(
                                EventKind::$variant,
                                instance.target.clone(),
                                instance.payload.clone(),
                                &commands,
                            ));
                        }
                    }
                });
            $listeners.push((EventKind::$variant, id));
        }
    };
    ($self:ident, $listeners:ident, $action_id:ident, $hook:expr, $variant:ident, notice) => {
        if let Some(hook) = $hook {
            let commands = $self.commands.clone();
            let action_id = $action_id.to_string();
            let id = $self
                .commands
                .connection()
                .on(EventKind::$variant, move |event| {
                    if let InboundEvent::$variant(notice) = event {
                        if notice.target.action == action_id {
                            hook(ActionEvent::new(
                                EventKind::$variant,
                                notice.target.clone(),
                                (),
                                &commands,
                            ));
                        }
                    }
                });
            $listeners.push((EventKind::$variant, id));
        }
    };
}

impl Router {
    pub fn new(commands: Commands, manifest: Arc<Manifest>) -> Self {
        Self {
            commands,
            manifest,
            routes: Mutex::new(Vec::new()),
        }
    }

    /// Route instance events of `action_id` to `handler`.
    ///
    /// An id the manifest does not declare is logged and skipped; returns
    /// whether the route was installed.
    pub fn route(&self, action_id: &str, handler: ActionHandler) -> bool {
        if !self.manifest.declares_action(action_id) {
            tracing::warn!(
                action = action_id,
                "not routing action: it is not declared in the manifest"
            );
            return false;
        }

        let ActionHandler {
            will_appear,
            will_disappear,
            key_down,
            key_up,
            dial_down,
            dial_up,
            dial_rotate,
            touch_tap,
            did_receive_settings,
            title_parameters_did_change,
            property_inspector_did_appear,
            property_inspector_did_disappear,
            send_to_plugin,
        } = handler;

        let mut listeners = Vec::new();
        wire!(self, listeners, action_id, will_appear, WillAppear);
        wire!(self, listeners, action_id, will_disappear, WillDisappear);
        wire!(self, listeners, action_id, key_down, KeyDown);
        wire!(self, listeners, action_id, key_up, KeyUp);
        wire!(self, listeners, action_id, dial_down, DialDown);
        wire!(self, listeners, action_id, dial_up, DialUp);
        wire!(self, listeners, action_id, dial_rotate, DialRotate);
        wire!(self, listeners, action_id, touch_tap, TouchTap);
        wire!(self, listeners, action_id, did_receive_settings, DidReceiveSettings);
        wire!(
            self,
            listeners,
            action_id,
            title_parameters_did_change,
            TitleParametersDidChange
        );
        wire!(
            self,
            listeners,
            action_id,
            property_inspector_did_appear,
            PropertyInspectorDidAppear,
            notice
        );
        wire!(
            self,
            listeners,
            action_id,
            property_inspector_did_disappear,
            PropertyInspectorDidDisappear,
            notice
        );
        wire!(self, listeners, action_id, send_to_plugin, SendToPlugin);

        tracing::debug!(action = action_id, hooks = listeners.len(), "route installed");
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Route {
                action_id: action_id.to_string(),
                listeners,
            });
        true
    }

    /// Number of installed routes.
    pub fn len(&self) -> usize {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Connection listeners installed for `action_id`, across all its routes.
    pub fn listener_count(&self, action_id: &str) -> usize {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.action_id == action_id)
            .map(|r| r.listeners.len())
            .sum()
    }
}
