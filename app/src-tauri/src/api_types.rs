//! FILENAME: app/src-tauri/src/api_types.rs
// PURPOSE: UI-facing message types for the IPC surface.

use ntclient::{EntryUpdate, EntryValue};
use serde::Serialize;

/// The flat record emitted to the UI on the `received` channel for every
/// inbound telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryUpdate {
    pub key: String,
    pub value: EntryValue,
    pub value_type: String,
    pub msg_type: String,
    pub id: u32,
    pub flags: u32,
}

impl TelemetryUpdate {
    /// Repackage a client entry event for the UI. Values arriving as the
    /// literal strings "true"/"false" become real booleans; everything else
    /// passes through unchanged.
    pub fn from_entry(entry: EntryUpdate) -> Self {
        let value = match entry.value {
            EntryValue::Text(text) if text == "true" => EntryValue::Boolean(true),
            EntryValue::Text(text) if text == "false" => EntryValue::Boolean(false),
            other => other,
        };
        Self {
            key: entry.key,
            value,
            value_type: entry.value_type,
            msg_type: entry.msg_type,
            id: entry.id,
            flags: entry.flags,
        }
    }
}
