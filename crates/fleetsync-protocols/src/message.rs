//! Live channel wire messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::LocationSample;

/// Messages the client pushes over the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Position report for the tracked vehicle.
    LocationUpdate(LocationSample),
}

impl OutboundMessage {
    pub fn location_update(sample: LocationSample) -> Self {
        Self::LocationUpdate(sample)
    }
}

/// Event pushed by the server.
///
/// Only the `type` discriminator is required; every other field is kept
/// verbatim so consumers can pick what they understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Event types the dashboards react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    LocationUpdate,
    TruckStatusUpdate,
    Error,
    Unknown,
}

impl InboundEvent {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "location_update" => EventKind::LocationUpdate,
            "truck_status_update" => EventKind::TruckStatusUpdate,
            "error" => EventKind::Error,
            _ => EventKind::Unknown,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
