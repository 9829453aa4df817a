//! Control-surface wire messages.
//!
//! UI clients talk to the daemon over a newline-delimited JSON socket. The
//! operations mirror the surface the renderer used: scan control, registry
//! snapshots, device selection/adoption, config load/save, and the
//! interactive hotkey test.

use crate::action::ActionKind;
use crate::config::{ConfigUpdate, DeviceConfig};
use crate::device::DeviceState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub op: ControlOp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ControlOp {
    StartScan,
    StopScan,
    Snapshot,
    SelectDevice(DeviceRef),
    AddDevice(DeviceRef),
    LoadConfig(DeviceRef),
    SaveConfig(SaveConfigPayload),
    TestHotkey(TestHotkeyPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRef {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveConfigPayload {
    pub address: String,
    pub update: ConfigUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestHotkeyPayload {
    /// Action kind; plain hotkey when the client does not say.
    #[serde(rename = "type", default)]
    pub kind: ActionKind,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_duration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub result: ControlResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ControlResult {
    Ok,
    Snapshot(SnapshotPayload),
    Config(DeviceConfig),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub devices: Vec<DeviceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_device: Option<String>,
    pub scanning: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub message: String,
}

impl ControlResponse {
    pub fn ok(id: Option<u64>) -> Self {
        Self {
            id,
            result: ControlResult::Ok,
        }
    }

    pub fn error(id: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            id,
            result: ControlResult::Error(ErrorPayload {
                message: message.into(),
            }),
        }
    }
}
