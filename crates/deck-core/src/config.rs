//! Per-device action-mapping configuration document.
//!
//! The registry is keyed by the raw device address; the persistence backend
//! is keyed by the normalized config id derived from it. Both forms identify
//! the same physical device.

use crate::action::{strip_predefined, GpioAction};
use crate::device::{default_device_name, VOLUME_GPIO};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persistence-backend key for a device address: separator characters
/// replaced with dashes, case-folded. Every caller of the backend must apply
/// this same transformation.
pub fn config_id_for_address(address: &str) -> String {
    address.replace(':', "-").to_lowercase()
}

/// The JSON document stored by the persistence backend, one per config id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub gpios: BTreeMap<String, GpioAction>,
    #[serde(default = "default_volume_gpio")]
    pub volume_gpio: String,
}

fn default_volume_gpio() -> String {
    VOLUME_GPIO.to_string()
}

impl DeviceConfig {
    /// Fresh default document for a device that has no stored config yet.
    /// The rotary channel is handled by fixed volume semantics, so `gpios`
    /// starts empty and never gains the reserved pin.
    pub fn default_for_address(address: &str) -> Self {
        Self {
            id: config_id_for_address(address),
            name: default_device_name(address),
            gpios: BTreeMap::new(),
            volume_gpio: default_volume_gpio(),
        }
    }

    /// Applies a partial update on top of this document, then normalizes the
    /// result for persistence: legacy `predefined:` markers are stripped and
    /// the reserved rotary pin is dropped if a caller smuggled it in.
    pub fn merged(&self, update: ConfigUpdate) -> Self {
        let mut merged = self.clone();
        if let Some(name) = update.name {
            merged.name = name;
        }
        if let Some(gpios) = update.gpios {
            merged.gpios = gpios;
        }
        merged.normalize();
        merged
    }

    fn normalize(&mut self) {
        self.gpios.remove(VOLUME_GPIO);
        for action in self.gpios.values_mut() {
            if action.action.starts_with(crate::action::PREDEFINED_PREFIX) {
                action.action = strip_predefined(&action.action).to_string();
            }
        }
    }
}

/// Partial config edit as submitted by a UI surface. `gpios`, when present,
/// replaces the whole mapping (top-level merge, no per-slot patching).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpios: Option<BTreeMap<String, GpioAction>>,
}
