//! Live views of host state the plugin is told about: connected devices and
//! the action instances currently on screen.

use crate::Connection;
use deckbridge_core::{ActionTarget, DeviceInfo, EventKind, InboundEvent, RegisteredDevice};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A device known to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub info: DeviceInfo,
}

/// Devices seeded from registration and kept current by connect/disconnect
/// events.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Arc<Mutex<BTreeMap<String, DeviceInfo>>>,
}

impl DeviceRegistry {
    pub fn new(seed: &[RegisteredDevice]) -> Self {
        let devices = seed
            .iter()
            .map(|d| (d.id.clone(), d.info.clone()))
            .collect();
        Self {
            devices: Arc::new(Mutex::new(devices)),
        }
    }

    /// Follow device events on `connection`.
    pub fn attach(&self, connection: &Connection) {
        let devices = Arc::clone(&self.devices);
        connection.on(EventKind::DeviceDidConnect, move |event| {
            if let InboundEvent::DeviceDidConnect(connected) = event {
                tracing::info!(device = %connected.device, name = %connected.device_info.name, "device connected");
                devices
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(connected.device.clone(), connected.device_info.clone());
            }
        });

        let devices = Arc::clone(&self.devices);
        connection.on(EventKind::DeviceDidDisconnect, move |event| {
            if let InboundEvent::DeviceDidDisconnect(gone) = event {
                tracing::info!(device = %gone.device, "device disconnected");
                devices
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&gone.device);
            }
        });
    }

    pub fn get(&self, id: &str) -> Option<Device> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|info| Device {
                id: id.to_string(),
                info: info.clone(),
            })
    }

    /// All known devices, ordered by id.
    pub fn snapshot(&self) -> Vec<Device> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, info)| Device {
                id: id.clone(),
                info: info.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Action instances between `willAppear` and `willDisappear`, keyed by
/// context.
#[derive(Debug, Clone, Default)]
pub struct VisibleActions {
    visible: Arc<Mutex<BTreeMap<String, ActionTarget>>>,
}

impl VisibleActions {
    pub fn attach(&self, connection: &Connection) {
        let visible = Arc::clone(&self.visible);
        connection.on(EventKind::WillAppear, move |event| {
            if let InboundEvent::WillAppear(instance) = event {
                visible
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(instance.target.context.clone(), instance.target.clone());
            }
        });

        let visible = Arc::clone(&self.visible);
        connection.on(EventKind::WillDisappear, move |event| {
            if let InboundEvent::WillDisappear(instance) = event {
                visible
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&instance.target.context);
            }
        });
    }

    /// Visible instances of `action_id`.
    pub fn targets(&self, action_id: &str) -> Vec<ActionTarget> {
        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|t| t.action == action_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckbridge_core::{DeviceSize, RegistrationFrame};

    fn connection() -> Connection {
        Connection::with_endpoint(
            "ws://127.0.0.1:1",
            RegistrationFrame::new("registerPlugin", "plugin"),
        )
    }

    fn info(name: &str) -> DeviceInfo {
        DeviceInfo {
            name: name.into(),
            size: DeviceSize { columns: 5, rows: 3 },
            kind: 0,
        }
    }

    #[test]
    fn registry_follows_connect_and_disconnect() {
        let connection = connection();
        let registry = DeviceRegistry::new(&[RegisteredDevice {
            id: "seeded".into(),
            info: info("Desk"),
        }]);
        registry.attach(&connection);
        assert_eq!(registry.get("seeded").unwrap().info.name, "Desk");

        connection.handle_text(
            r#"{"event":"deviceDidConnect","device":"plus","deviceInfo":{"name":"Plus","type":7,"size":{"columns":4,"rows":2}}}"#,
        );
        let ids: Vec<String> = registry.snapshot().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["plus", "seeded"]);
        assert_eq!(registry.get("plus").unwrap().info.kind, 7);

        connection.handle_text(r#"{"event":"deviceDidDisconnect","device":"seeded"}"#);
        assert!(registry.get("seeded").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn visible_actions_track_appear_and_disappear() {
        let connection = connection();
        let visible = VisibleActions::default();
        visible.attach(&connection);

        let frame = |event: &str, action: &str, context: &str| {
            format!(
                r#"{{"event":"{event}","action":"{action}","context":"{context}","device":"d","payload":{{"settings":{{}}}}}}"#
            )
        };
        connection.handle_text(&frame("willAppear", "com.example.a", "1"));
        connection.handle_text(&frame("willAppear", "com.example.a", "2"));
        connection.handle_text(&frame("willAppear", "com.example.b", "3"));
        connection.handle_text(&frame("willDisappear", "com.example.a", "1"));

        let contexts: Vec<String> = visible
            .targets("com.example.a")
            .into_iter()
            .map(|t| t.context)
            .collect();
        assert_eq!(contexts, vec!["2"]);
        assert_eq!(visible.len(), 2);
        assert!(visible.targets("com.example.missing").is_empty());
    }
}
