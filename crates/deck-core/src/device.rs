use serde::{Deserialize, Serialize};

/// Number of addressable GPIO channels on the device.
pub const GPIO_COUNT: usize = 16;

/// Slot index of the reserved analog rotary/volume channel.
pub const VOLUME_SLOT: usize = 0;

/// Pin identifier of the reserved rotary channel. Fixed, not user-assignable.
pub const VOLUME_GPIO: &str = "d15";

/// Slot index to physical pin identifier. Slot 0 is the rotary channel;
/// the remaining slots are the digital button pins in wiring order.
pub const GPIO_PIN_MAP: [&str; GPIO_COUNT] = [
    "d15", "d2", "d4", "d5", "d12", "d13", "d14", "d16", "d17", "d18", "d19", "d21", "d25", "d26",
    "d27", "d33",
];

/// Looks up the pin identifier for a GPIO slot.
pub fn pin_for_slot(slot: usize) -> Option<&'static str> {
    GPIO_PIN_MAP.get(slot).copied()
}

/// Placeholder display name derived from the device address, used until the
/// producer supplies a real one. The address is opaque producer data, so the
/// five-character tail is cut on char boundaries, never byte offsets.
pub fn default_device_name(address: &str) -> String {
    let tail_start = address
        .char_indices()
        .rev()
        .nth(4)
        .map_or(0, |(index, _)| index);
    format!("ESP32-{}", &address[tail_start..])
}

/// Snapshot form of one registry record, as handed to UI clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub address: String,
    pub name: String,
    pub gpio_states: Vec<u16>,
    pub last_seen_ms: i64,
    pub connected: bool,
    pub added: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_map_reserves_slot_zero_for_rotary() {
        assert_eq!(pin_for_slot(VOLUME_SLOT), Some(VOLUME_GPIO));
        assert_eq!(pin_for_slot(15), Some("d33"));
        assert_eq!(pin_for_slot(16), None);
    }

    #[test]
    fn pin_map_has_no_duplicates() {
        let mut pins = GPIO_PIN_MAP.to_vec();
        pins.sort_unstable();
        pins.dedup();
        assert_eq!(pins.len(), GPIO_COUNT);
    }

    #[test]
    fn default_name_uses_address_tail() {
        assert_eq!(default_device_name("AA:BB:CC:DD:EE:01"), "ESP32-EE:01");
        assert_eq!(default_device_name("X:01"), "ESP32-X:01");
        assert_eq!(default_device_name(""), "ESP32-");
    }

    #[test]
    fn default_name_counts_chars_not_bytes() {
        // A tail cut five bytes from the end would land inside the euro sign.
        assert_eq!(default_device_name("€abcd"), "ESP32-€abcd");
        assert_eq!(default_device_name("dev-€-01"), "ESP32--€-01");
        assert_eq!(default_device_name("日本語"), "ESP32-日本語");
    }

    #[test]
    fn device_state_serializes_camel_case() {
        let state = DeviceState {
            address: "AA:BB:CC:DD:EE:01".to_string(),
            name: "ESP32-EE:01".to_string(),
            gpio_states: vec![0; GPIO_COUNT],
            last_seen_ms: 1_700_000_000_000,
            connected: true,
            added: false,
        };
        let value = serde_json::to_value(&state).expect("serialize");
        assert!(value.get("gpioStates").is_some());
        assert!(value.get("lastSeenMs").is_some());
        assert!(value.get("gpio_states").is_none());
    }
}
