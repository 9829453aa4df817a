//! Wire shape of the out-of-process scanner's stdout stream and the
//! normalizer that turns raw lines into a closed event set.
//!
//! The producer emits newline-delimited JSON. Lines may be telemetry,
//! explicit connect/disconnect notices, error reports, or free-form
//! diagnostics; anything that is not valid JSON is dropped without an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_DEVICE_CONNECTED: &str = "device_connected";
pub const EVENT_DEVICE_DISCONNECTED: &str = "device_disconnected";

/// One inbound message as the producer shapes it. Every field is optional;
/// classification decides what the message actually is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScannerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpio_states: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

/// Normalized event kind. Downstream code matches on this exhaustively
/// instead of re-deriving the kind from field presence.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Telemetry {
        address: String,
        name: Option<String>,
        gpio_states: Vec<u16>,
    },
    Connected {
        address: String,
        name: Option<String>,
    },
    Disconnected {
        address: String,
    },
    Error {
        reason: String,
    },
    /// Partial or diagnostic line. Dropped silently by the registry;
    /// the lenient-parsing policy is deliberate.
    Malformed,
}

/// Classifies one inbound message into exactly one event.
pub fn classify(message: ScannerMessage) -> DeviceEvent {
    if let Some(reason) = message.error {
        return DeviceEvent::Error { reason };
    }

    match message.event.as_deref() {
        Some(EVENT_DEVICE_CONNECTED) => {
            return match message.address {
                Some(address) => DeviceEvent::Connected {
                    address,
                    name: message.name,
                },
                None => DeviceEvent::Malformed,
            };
        }
        Some(EVENT_DEVICE_DISCONNECTED) => {
            return match message.address {
                Some(address) => DeviceEvent::Disconnected { address },
                None => DeviceEvent::Malformed,
            };
        }
        _ => {}
    }

    match (message.address, message.gpio_states) {
        (Some(address), Some(gpio_states)) => DeviceEvent::Telemetry {
            address,
            name: message.name,
            gpio_states,
        },
        _ => DeviceEvent::Malformed,
    }
}

/// Parses one raw stdout line. Returns `None` for non-JSON lines, which the
/// caller ignores without raising an error.
pub fn classify_line(line: &str) -> Option<DeviceEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let message: ScannerMessage = serde_json::from_str(trimmed).ok()?;
    Some(classify(message))
}
