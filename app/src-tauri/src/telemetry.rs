//! FILENAME: app/src-tauri/src/telemetry.rs
// PURPOSE: Bridge between the robot telemetry client session and the UI.

use std::time::Duration;

use ntclient::{Client, ClientError, EntryValue};
use tauri::{AppHandle, Emitter, State};

use crate::api_types::TelemetryUpdate;
use crate::{log_debug, log_error, log_info, log_warn, AppState};

pub struct TelemetryBridge {
    client: Client,
}

impl TelemetryBridge {
    pub fn new(reconnect_delay: Duration) -> Self {
        let mut client = Client::new("signbench");
        client.set_reconnect_delay(reconnect_delay);
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Swap in a fresh forwarding listener. Clearing first keeps duplicate
    /// connects from double-forwarding every update.
    pub fn install_forwarding(&self, app: &AppHandle) {
        self.client.clear_listeners();
        let app = app.clone();
        self.client.add_listener(move |entry| {
            let package = TelemetryUpdate::from_entry(entry);
            log_debug!(
                "NT",
                "packaging data: {}",
                serde_json::to_string(&package).unwrap_or_default()
            );
            if let Err(e) = app.emit("received", &package) {
                log_error!("NT", "failed to forward telemetry update: {}", e);
            }
        });
    }
}

/// Establish the telemetry session and report the outcome to the UI:
/// `connected` on success, a labeled `error` string otherwise.
#[tauri::command]
pub async fn connect(
    app: AppHandle,
    state: State<'_, AppState>,
    address: String,
) -> Result<(), String> {
    log_info!("NT", "connecting to robot @ {}", address);

    match state.telemetry.client().start(&address).await {
        Err(e) => {
            log_warn!("NT", "failed to connect ({})", e);
            app.emit("error", format!("Failed to connect. ({})", e))
                .map_err(|e| e.to_string())?;
        }
        Ok(false) => {
            log_warn!("NT", "failed to connect (no robot)");
            app.emit("error", "Failed to connect. (no robot)".to_string())
                .map_err(|e| e.to_string())?;
        }
        Ok(true) => {
            state.telemetry.install_forwarding(&app);
            log_info!("NT", "connected to robot @ {}", address);
            app.emit("connected", ()).map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}

#[tauri::command]
pub fn put(
    app: AppHandle,
    state: State<AppState>,
    id: String,
    data: String,
) -> Result<(), String> {
    let wrote = put_value(state.telemetry.client(), &id, &data).map_err(|e| e.to_string())?;
    if wrote {
        app.emit("updated", ()).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Outbound write path: a no-op while disconnected, otherwise coerce the
/// submitted string once (number, then boolean, else string) and update an
/// announced key or assign a new one. Returns whether anything was written.
pub fn put_value(client: &Client, id: &str, data: &str) -> Result<bool, ClientError> {
    if !client.is_connected() {
        return Ok(false);
    }

    let value = EntryValue::parse(data);
    match client.key_id(id) {
        Some(entry_id) => client.update(entry_id, value)?,
        None => client.assign(id, value, false)?,
    }

    Ok(true)
}
