//! Counter plugin.
//!
//! Each key press (or dial tick) bumps a per-instance count kept in the
//! instance settings and shows it as the title. The host starts the binary
//! with its registration flags from the plugin bundle directory:
//!
//!   counter -port 28196 -pluginUUID <uuid> -registerEvent registerPlugin -info '{...}'

use deckbridge_client::{ActionHandle, ActionHandler, Commands, Plugin};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const INCREMENT: &str = "com.example.counter.increment";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CounterSettings {
    #[serde(default)]
    count: i64,
}

impl CounterSettings {
    fn from_value(settings: &Value) -> Self {
        serde_json::from_value(settings.clone()).unwrap_or_default()
    }
}

fn show(action: &ActionHandle, settings: &CounterSettings) {
    let _ = action.set_title(settings.count.to_string());
}

fn bump(action: &ActionHandle, settings: &Value, by: i64) {
    let mut settings = CounterSettings::from_value(settings);
    settings.count += by;
    tracing::info!(context = action.context(), count = settings.count, "count changed");
    let _ = action.set_settings(&settings);
    show(action, &settings);
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Totals {
    #[serde(default)]
    presses: u64,
}

/// Keep a plugin-wide press count in the global settings.
async fn count_total(commands: Commands) {
    match commands.get_global_settings::<Totals>().await {
        Ok(mut totals) => {
            totals.presses += 1;
            let _ = commands.set_global_settings(&totals);
        }
        Err(e) => tracing::warn!("failed to read global settings: {}", e),
    }
}

/// Push the current count to the property inspector.
async fn report_to_inspector(action: ActionHandle) {
    match action.get_settings::<CounterSettings>().await {
        Ok(settings) => {
            let _ = action.send_to_property_inspector(&settings);
        }
        Err(e) => tracing::warn!(context = action.context(), "failed to read settings: {}", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("counter=info".parse()?))
        .init();

    let plugin = Plugin::from_env()?;

    let commands = plugin.commands().clone();
    let totals = plugin.commands().clone();
    plugin.route(
        INCREMENT,
        ActionHandler::new()
            .on_will_appear(|ev| show(&ev.action, &CounterSettings::from_value(&ev.payload.settings)))
            .on_did_receive_settings(|ev| {
                show(&ev.action, &CounterSettings::from_value(&ev.payload.settings))
            })
            .on_key_down(move |ev| {
                bump(&ev.action, &ev.payload.settings, 1);
                tokio::spawn(count_total(totals.clone()));
            })
            .on_dial_rotate(|ev| bump(&ev.action, &ev.payload.settings, i64::from(ev.payload.ticks)))
            .on_dial_down(|ev| {
                let _ = ev.action.set_settings(&CounterSettings::default());
                show(&ev.action, &CounterSettings::default());
            })
            .on_property_inspector_did_appear(|ev| {
                tokio::spawn(report_to_inspector(ev.action));
            })
            .on_send_to_plugin(move |ev| {
                if ev.payload["command"] == "reset" {
                    let _ = commands.log_message(&format!("reset {}", ev.action.context()));
                    let _ = ev.action.set_settings(&CounterSettings::default());
                    let _ = ev.action.show_ok();
                    show(&ev.action, &CounterSettings::default());
                }
            }),
    );

    for device in plugin.devices() {
        tracing::info!(device = %device.id, name = %device.info.name, "device present at launch");
    }

    plugin.run().await;
    Ok(())
}
