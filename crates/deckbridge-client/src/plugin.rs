//! Process-level entry point tying the pieces together.

use crate::action::ActionHandle;
use crate::commands::Commands;
use crate::router::{ActionHandler, Router};
use crate::tracking::{Device, DeviceRegistry, VisibleActions};
use crate::{Connection, PluginError};
use deckbridge_core::{Manifest, RegistrationParameters};
use std::sync::Arc;

/// One plugin process: launch parameters, manifest, the host connection and
/// everything built on it.
#[derive(Debug)]
pub struct Plugin {
    params: RegistrationParameters,
    manifest: Arc<Manifest>,
    connection: Connection,
    commands: Commands,
    router: Router,
    devices: DeviceRegistry,
    visible: VisibleActions,
}

impl Plugin {
    pub fn new(params: RegistrationParameters, manifest: Manifest) -> Self {
        let manifest = Arc::new(manifest);
        let connection = Connection::new(&params);
        let commands = Commands::new(connection.clone(), &params.plugin_uuid);
        let router = Router::new(commands.clone(), Arc::clone(&manifest));

        let devices = DeviceRegistry::new(&params.info.devices);
        devices.attach(&connection);
        let visible = VisibleActions::default();
        visible.attach(&connection);

        Self {
            params,
            manifest,
            connection,
            commands,
            router,
            devices,
            visible,
        }
    }

    /// Build from the process arguments and `manifest.json` in the working
    /// directory.
    pub fn from_env() -> Result<Self, PluginError> {
        let params = RegistrationParameters::from_env()?;
        let manifest = Manifest::from_path(Manifest::FILE_NAME)?;
        Ok(Self::new(params, manifest))
    }

    pub fn params(&self) -> &RegistrationParameters {
        &self.params
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// See [`Router::route`].
    pub fn route(&self, action_id: &str, handler: ActionHandler) -> bool {
        self.router.route(action_id, handler)
    }

    /// Devices currently known to the host.
    pub fn devices(&self) -> Vec<Device> {
        self.devices.snapshot()
    }

    /// Handles for the on-screen instances of `action_id`.
    pub fn visible_actions(&self, action_id: &str) -> Vec<ActionHandle> {
        self.visible
            .targets(action_id)
            .into_iter()
            .map(|target| self.commands.action(target))
            .collect()
    }

    pub fn connect(&self) {
        self.connection.connect();
    }

    /// Connect and wait until the host closes the connection.
    pub async fn run(&self) {
        tracing::info!(
            plugin = %self.params.plugin_uuid,
            endpoint = %self.params.endpoint(),
            routes = self.router.len(),
            "starting plugin"
        );
        self.connect();
        self.connection.closed().await;
        tracing::info!("host connection closed");
    }
}
