//! FILENAME: core/ntclient/src/proto.rs
//! Wire format for the telemetry session: batches of `method`/`params`
//! messages as JSON text frames. Private to this crate; the host only ever
//! sees `EntryValue` and `EntryUpdate`.

use serde::{Deserialize, Serialize};

/// A typed entry value, decided once at the boundary that produced it.
/// Serializes as a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl EntryValue {
    /// Coerce a raw UI-submitted string: number first, then boolean,
    /// anything else stays text.
    pub fn parse(raw: &str) -> Self {
        // Non-finite floats have no JSON scalar form; "NaN"/"inf" stay text.
        if let Ok(number) = raw.parse::<f64>() {
            if number.is_finite() {
                return EntryValue::Number(number);
            }
        }
        match raw {
            "true" => EntryValue::Boolean(true),
            "false" => EntryValue::Boolean(false),
            _ => EntryValue::Text(raw.to_string()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            EntryValue::Boolean(_) => "boolean",
            EntryValue::Number(_) => "double",
            EntryValue::Text(_) => "string",
        }
    }
}

/// One inbound entry event handed to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryUpdate {
    pub key: String,
    pub value: EntryValue,
    pub value_type: String,
    pub msg_type: String,
    pub id: u32,
    pub flags: u32,
}

/// One wire message. A frame is a JSON array of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "lowercase")]
pub enum WireMessage {
    /// Client -> server: subscribe to every topic under the given prefixes.
    Subscribe {
        topics: Vec<String>,
        subuid: u32,
        options: SubscribeOptions,
    },
    /// Server -> client: a topic exists; carries its id, type and flags,
    /// and optionally its current value.
    Announce {
        name: String,
        id: u32,
        #[serde(rename = "type")]
        value_type: String,
        #[serde(default)]
        flags: u32,
        #[serde(default)]
        value: Option<EntryValue>,
    },
    /// Server -> client: a topic went away.
    Unannounce { name: String, id: u32 },
    /// Either direction: a value changed for a known topic id.
    Update { id: u32, value: EntryValue },
    /// Client -> server: create a topic the server has not announced.
    Publish {
        name: String,
        #[serde(rename = "type")]
        value_type: String,
        persistent: bool,
        value: EntryValue,
    },
}

pub fn encode(batch: &[WireMessage]) -> Result<String, serde_json::Error> {
    serde_json::to_string(batch)
}

pub fn decode(text: &str) -> Result<Vec<WireMessage>, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn subscribe_all(subuid: u32) -> Result<String, serde_json::Error> {
    encode(&[WireMessage::Subscribe {
        topics: vec![String::new()],
        subuid,
        options: SubscribeOptions { prefix: true },
    }])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    pub prefix: bool,
}
