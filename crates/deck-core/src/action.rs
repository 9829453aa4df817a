use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hold duration applied at execution time when a hotkey action has none.
pub const DEFAULT_HOLD_DURATION: f64 = 0.1;

/// Legacy UI marker for actions picked from a canned list. Purely a display
/// disambiguation; must never reach the persistence backend or an executor.
pub const PREDEFINED_PREFIX: &str = "predefined:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Key,
    Hotkey,
    Multimedia,
    System,
    Custom,
}

impl Default for ActionKind {
    fn default() -> Self {
        ActionKind::Hotkey
    }
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Key => "key",
            ActionKind::Hotkey => "hotkey",
            ActionKind::Multimedia => "multimedia",
            ActionKind::System => "system",
            ActionKind::Custom => "custom",
        }
    }
}

/// Action assigned to one GPIO button slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GpioAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("no action specified")]
    Empty,
}

impl GpioAction {
    /// The action payload with the legacy `predefined:` marker stripped.
    pub fn normalized_action(&self) -> &str {
        strip_predefined(&self.action)
    }

    /// Copy with the payload normalized for persistence or execution.
    pub fn normalized(&self) -> Self {
        Self {
            action: self.normalized_action().to_string(),
            ..self.clone()
        }
    }

    pub fn hold_duration_or_default(&self) -> f64 {
        self.hold_duration.unwrap_or(DEFAULT_HOLD_DURATION)
    }

    /// Resolves the descriptor to the hotkey string handed to the execution
    /// backend. Named multimedia and system commands map through fixed
    /// tables; unknown names pass through unchanged.
    pub fn resolve_hotkey(&self) -> Result<String, ActionError> {
        let action = self.normalized_action();
        if action.is_empty() {
            return Err(ActionError::Empty);
        }
        let resolved = match self.kind {
            ActionKind::Key | ActionKind::Hotkey | ActionKind::Custom => action,
            ActionKind::Multimedia => multimedia_hotkey(action).unwrap_or(action),
            ActionKind::System => system_hotkey(action).unwrap_or(action),
        };
        Ok(resolved.to_string())
    }
}

pub fn strip_predefined(action: &str) -> &str {
    action.strip_prefix(PREDEFINED_PREFIX).unwrap_or(action)
}

fn multimedia_hotkey(name: &str) -> Option<&'static str> {
    match name {
        "play_pause" => Some("space"),
        "next_track" => Some("ctrl + right"),
        "prev_track" => Some("ctrl + left"),
        "volume_up" => Some("ctrl + up"),
        "volume_down" => Some("ctrl + down"),
        "mute" => Some("ctrl + m"),
        _ => None,
    }
}

fn system_hotkey(name: &str) -> Option<&'static str> {
    match name {
        "screenshot" => Some("win + shift + s"),
        "sleep" => Some("win + x, u, s"),
        "lock" => Some("win + l"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotkey(action: &str) -> GpioAction {
        GpioAction {
            kind: ActionKind::Hotkey,
            action: action.to_string(),
            hold_duration: None,
            label: None,
        }
    }

    #[test]
    fn strips_predefined_prefix() {
        let action = hotkey("predefined:ctrl + c");
        assert_eq!(action.normalized_action(), "ctrl + c");
        assert_eq!(action.normalized().action, "ctrl + c");

        let plain = hotkey("ctrl + c");
        assert_eq!(plain.normalized(), plain);
    }

    #[test]
    fn hold_duration_defaults_at_execution() {
        assert_eq!(hotkey("a").hold_duration_or_default(), DEFAULT_HOLD_DURATION);
        let held = GpioAction {
            hold_duration: Some(0.5),
            ..hotkey("a")
        };
        assert_eq!(held.hold_duration_or_default(), 0.5);
    }

    #[test]
    fn resolves_multimedia_and_system_names() {
        let multimedia = GpioAction {
            kind: ActionKind::Multimedia,
            ..hotkey("next_track")
        };
        assert_eq!(multimedia.resolve_hotkey(), Ok("ctrl + right".to_string()));

        let system = GpioAction {
            kind: ActionKind::System,
            ..hotkey("lock")
        };
        assert_eq!(system.resolve_hotkey(), Ok("win + l".to_string()));

        // Unknown names pass through so free-typed combos still work.
        let custom_media = GpioAction {
            kind: ActionKind::Multimedia,
            ..hotkey("ctrl + shift + p")
        };
        assert_eq!(
            custom_media.resolve_hotkey(),
            Ok("ctrl + shift + p".to_string())
        );
    }

    #[test]
    fn empty_action_is_rejected() {
        assert_eq!(hotkey("").resolve_hotkey(), Err(ActionError::Empty));
        assert_eq!(hotkey("predefined:").resolve_hotkey(), Err(ActionError::Empty));
    }

    #[test]
    fn serde_uses_type_tag_and_camel_case() {
        let json = r#"{"type":"hotkey","action":"ctrl + c","holdDuration":0.5,"label":"Copy"}"#;
        let action: GpioAction = serde_json::from_str(json).expect("parse");
        assert_eq!(action.kind, ActionKind::Hotkey);
        assert_eq!(action.hold_duration, Some(0.5));

        let value = serde_json::to_value(&action).expect("serialize");
        assert_eq!(value["type"], "hotkey");
        assert_eq!(value["holdDuration"], 0.5);
    }
}
