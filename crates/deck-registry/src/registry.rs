//! In-memory device registry.
//!
//! Keyed by raw device address. Records are created only by telemetry
//! observation and never removed; a device that falls silent or disconnects
//! is represented by `connected = false`. One lock guards the whole map, so
//! each event's mutation is atomic with respect to every other event.

use chrono::Utc;
use deck_core::device::{default_device_name, DeviceState};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

struct DeviceEntry {
    state: DeviceState,
    last_seen: Instant,
}

#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, DeviceEntry>>,
    current: RwLock<Option<String>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a record from one telemetry event. The GPIO array is
    /// overwritten wholesale, `connected` flips to true, and `added` is
    /// preserved. No implicit current-device selection happens here.
    pub async fn apply_telemetry(
        &self,
        address: &str,
        name: Option<String>,
        gpio_states: Vec<u16>,
    ) {
        let now_ms = Utc::now().timestamp_millis();
        let mut devices = self.devices.write().await;
        match devices.get_mut(address) {
            Some(entry) => {
                if let Some(name) = name {
                    entry.state.name = name;
                }
                entry.state.gpio_states = gpio_states;
                entry.state.last_seen_ms = now_ms;
                entry.state.connected = true;
                entry.last_seen = Instant::now();
            }
            None => {
                info!(event = "device_observed", address);
                devices.insert(
                    address.to_string(),
                    DeviceEntry {
                        state: DeviceState {
                            address: address.to_string(),
                            name: name.unwrap_or_else(|| default_device_name(address)),
                            gpio_states,
                            last_seen_ms: now_ms,
                            connected: true,
                            added: false,
                        },
                        last_seen: Instant::now(),
                    },
                );
            }
        }
    }

    /// Explicit disconnect signal. No-op for unknown addresses; the record
    /// is kept either way.
    pub async fn apply_disconnected(&self, address: &str) -> bool {
        let mut devices = self.devices.write().await;
        match devices.get_mut(address) {
            Some(entry) => {
                entry.state.connected = false;
                info!(event = "device_disconnected", address);
                true
            }
            None => {
                debug!(event = "disconnect_for_unknown_device", address);
                false
            }
        }
    }

    /// Adopts a discovered device into the persistent device list.
    /// Idempotent; `added` never transitions back to false.
    pub async fn mark_added(&self, address: &str) -> bool {
        let mut devices = self.devices.write().await;
        match devices.get_mut(address) {
            Some(entry) => {
                entry.state.added = true;
                true
            }
            None => false,
        }
    }

    /// Sets the process-wide current device. The address does not need to be
    /// connected, or even known yet.
    pub async fn select(&self, address: &str) {
        *self.current.write().await = Some(address.to_string());
    }

    pub async fn current_device(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    pub async fn get(&self, address: &str) -> Option<DeviceState> {
        self.devices
            .read()
            .await
            .get(address)
            .map(|entry| entry.state.clone())
    }

    pub async fn snapshot(&self) -> Vec<DeviceState> {
        let devices = self.devices.read().await;
        let mut states = devices
            .values()
            .map(|entry| entry.state.clone())
            .collect::<Vec<_>>();
        states.sort_by(|a, b| a.address.cmp(&b.address));
        states
    }

    pub async fn added_devices(&self) -> Vec<DeviceState> {
        let mut states = self.snapshot().await;
        states.retain(|state| state.added);
        states
    }

    /// Demotes connected records that have been silent longer than `timeout`.
    /// Returns the demoted addresses; already-disconnected records are
    /// skipped, so each silence episode produces exactly one transition.
    pub async fn sweep_stale(&self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut demoted = Vec::new();
        let mut devices = self.devices.write().await;
        for (address, entry) in devices.iter_mut() {
            if entry.state.connected && now.duration_since(entry.last_seen) > timeout {
                entry.state.connected = false;
                info!(event = "device_timeout", address = address.as_str());
                demoted.push(address.clone());
            }
        }
        demoted.sort();
        demoted
    }
}
