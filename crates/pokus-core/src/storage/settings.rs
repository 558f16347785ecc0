//! User settings stored in the key-value store.
//!
//! Settings are shared between the normal and developer data namespaces.
//! Unreadable or out-of-range values fall back to defaults.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::keys::{
    SETTINGS_DEV_MODE, SETTINGS_FLOW_RATIO, SETTINGS_FOCUS_GOAL, SETTINGS_NUDGE_ENABLED,
    SETTINGS_NUDGE_INTERVAL,
};
use super::KeyValueStore;
use crate::error::{CoreError, ValidationError};

/// Allowed Flowmodoro ratios (focus:break).
pub const FLOW_RATIO_OPTIONS: [u32; 4] = [3, 4, 5, 6];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Focus goal in minutes.
    pub focus_goal: u32,
    pub nudge_enabled: bool,
    /// Minutes between nudges.
    pub nudge_interval: u32,
    pub flow_ratio: u32,
    pub developer_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_goal: 5,
            nudge_enabled: true,
            nudge_interval: 5,
            flow_ratio: 4,
            developer_mode: false,
        }
    }
}

impl Settings {
    /// Read every setting, substituting defaults for missing or bad values.
    pub fn load<S: KeyValueStore>(store: &S) -> Self {
        let defaults = Self::default();
        Self {
            focus_goal: read(store, SETTINGS_FOCUS_GOAL)
                .filter(|v: &u32| *v >= 1)
                .unwrap_or(defaults.focus_goal),
            nudge_enabled: read(store, SETTINGS_NUDGE_ENABLED).unwrap_or(defaults.nudge_enabled),
            nudge_interval: read(store, SETTINGS_NUDGE_INTERVAL)
                .filter(|v: &u32| *v >= 1)
                .unwrap_or(defaults.nudge_interval),
            flow_ratio: read(store, SETTINGS_FLOW_RATIO)
                .filter(|v| FLOW_RATIO_OPTIONS.contains(v))
                .unwrap_or(defaults.flow_ratio),
            developer_mode: read(store, SETTINGS_DEV_MODE).unwrap_or(defaults.developer_mode),
        }
    }

    /// Only the developer-mode flag, which decides the data namespace.
    pub fn developer_mode<S: KeyValueStore>(store: &S) -> bool {
        read(store, SETTINGS_DEV_MODE).unwrap_or(false)
    }

    /// Persist all settings in one batch.
    pub fn save<S: KeyValueStore>(&self, store: &S) -> Result<(), CoreError> {
        self.validate()?;
        store.set_many(&[
            (SETTINGS_FOCUS_GOAL.to_string(), Some(self.focus_goal.to_string())),
            (SETTINGS_NUDGE_ENABLED.to_string(), Some(self.nudge_enabled.to_string())),
            (SETTINGS_NUDGE_INTERVAL.to_string(), Some(self.nudge_interval.to_string())),
            (SETTINGS_FLOW_RATIO.to_string(), Some(self.flow_ratio.to_string())),
            (SETTINGS_DEV_MODE.to_string(), Some(self.developer_mode.to_string())),
        ])?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.focus_goal == 0 {
            return Err(invalid("focus_goal", "must be at least 1 minute"));
        }
        if self.nudge_interval == 0 {
            return Err(invalid("nudge_interval", "must be at least 1 minute"));
        }
        if !FLOW_RATIO_OPTIONS.contains(&self.flow_ratio) {
            return Err(invalid(
                "flow_ratio",
                &format!("must be one of {FLOW_RATIO_OPTIONS:?}"),
            ));
        }
        Ok(())
    }

    /// Update a single setting by name from its string form.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), ValidationError> {
        let mut next = self.clone();
        match name {
            "focus_goal" => next.focus_goal = parse(name, value)?,
            "nudge_enabled" => next.nudge_enabled = parse(name, value)?,
            "nudge_interval" => next.nudge_interval = parse(name, value)?,
            "flow_ratio" => next.flow_ratio = parse(name, value)?,
            "developer_mode" => next.developer_mode = parse(name, value)?,
            _ => return Err(invalid(name, "unknown setting")),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn read<S: KeyValueStore, T: std::str::FromStr>(store: &S, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(raw)) => match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(key, raw = %raw, "ignoring malformed setting");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "failed to read setting");
            None
        }
    }
}

fn parse<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ValidationError> {
    value
        .parse::<T>()
        .map_err(|_| invalid(field, &format!("cannot parse '{value}'")))
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn missing_settings_use_defaults() {
        let store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn malformed_values_fall_back() {
        let store = MemoryStore::new();
        store.set(SETTINGS_FLOW_RATIO, "9").unwrap();
        store.set(SETTINGS_NUDGE_INTERVAL, "soon").unwrap();
        store.set(SETTINGS_NUDGE_ENABLED, "false").unwrap();
        let settings = Settings::load(&store);
        assert_eq!(settings.flow_ratio, 4);
        assert_eq!(settings.nudge_interval, 5);
        assert!(!settings.nudge_enabled);
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let settings = Settings {
            focus_goal: 25,
            nudge_enabled: false,
            nudge_interval: 10,
            flow_ratio: 6,
            developer_mode: true,
        };
        settings.save(&store).unwrap();
        assert_eq!(Settings::load(&store), settings);
        assert!(Settings::developer_mode(&store));
    }

    #[test]
    fn set_field_rejects_unknown_and_invalid() {
        let mut settings = Settings::default();
        assert!(settings.set_field("volume", "3").is_err());
        assert!(settings.set_field("flow_ratio", "2").is_err());
        assert_eq!(settings.flow_ratio, 4);
        settings.set_field("nudge_interval", "15").unwrap();
        assert_eq!(settings.nudge_interval, 15);
    }
}
