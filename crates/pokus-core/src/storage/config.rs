//! TOML-based game tuning configuration.
//!
//! Stores the numbers that shape play rather than user preferences:
//! - Encounter threshold and coin rate
//! - Catch chances for the timing bar
//! - Timing bar geometry
//! - Shiny odds
//! - Developer-mode overrides
//!
//! Configuration is stored at `~/.config/pokus/config.toml`. User settings
//! (nudges, flow ratio, developer mode toggle) live in the key-value store,
//! see [`super::Settings`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Tuning for rewards and the catch minigame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Banked focus seconds that buy one encounter; also the coin block size.
    #[serde(default = "default_encounter_threshold")]
    pub encounter_threshold_secs: u64,
    #[serde(default = "default_coins_per_block")]
    pub coins_per_block: u64,
    /// Catch chance at the exact centre of the green zone.
    #[serde(default = "default_catch_green")]
    pub catch_chance_green: f64,
    /// Catch chance at the green zone edges.
    #[serde(default = "default_catch_green_edge")]
    pub catch_chance_green_edge: f64,
    #[serde(default = "default_catch_miss")]
    pub catch_chance_miss: f64,
    #[serde(default = "default_bar_width")]
    pub timing_bar_width: u32,
    #[serde(default = "default_green_width")]
    pub timing_green_width: u32,
    #[serde(default = "default_cursor_width")]
    pub timing_cursor_width: u32,
    /// Cursor travel per animation frame.
    #[serde(default = "default_cursor_speed")]
    pub timing_cursor_speed: u32,
    #[serde(default = "default_shiny_base")]
    pub shiny_base: f64,
    #[serde(default = "default_shiny_max")]
    pub shiny_max: f64,
}

/// Overrides applied while developer mode is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperConfig {
    #[serde(default = "default_dev_encounter_threshold")]
    pub encounter_threshold_secs: u64,
    /// Only the first N species can appear.
    #[serde(default = "default_dev_pokedex_limit")]
    pub pokedex_limit: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pokus/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub developer: DeveloperConfig,
}

// Default functions
fn default_encounter_threshold() -> u64 {
    300
}
fn default_coins_per_block() -> u64 {
    1
}
fn default_catch_green() -> f64 {
    0.9
}
fn default_catch_green_edge() -> f64 {
    0.7
}
fn default_catch_miss() -> f64 {
    0.3
}
fn default_bar_width() -> u32 {
    320
}
fn default_green_width() -> u32 {
    80
}
fn default_cursor_width() -> u32 {
    12
}
fn default_cursor_speed() -> u32 {
    4
}
fn default_shiny_base() -> f64 {
    0.01
}
fn default_shiny_max() -> f64 {
    0.25
}
fn default_dev_encounter_threshold() -> u64 {
    1
}
fn default_dev_pokedex_limit() -> usize {
    20
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            encounter_threshold_secs: default_encounter_threshold(),
            coins_per_block: default_coins_per_block(),
            catch_chance_green: default_catch_green(),
            catch_chance_green_edge: default_catch_green_edge(),
            catch_chance_miss: default_catch_miss(),
            timing_bar_width: default_bar_width(),
            timing_green_width: default_green_width(),
            timing_cursor_width: default_cursor_width(),
            timing_cursor_speed: default_cursor_speed(),
            shiny_base: default_shiny_base(),
            shiny_max: default_shiny_max(),
        }
    }
}

impl Default for DeveloperConfig {
    fn default() -> Self {
        Self {
            encounter_threshold_secs: default_dev_encounter_threshold(),
            pokedex_limit: default_dev_pokedex_limit(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let bad_value = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| bad_value(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| bad_value(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(bad_value(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let next: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Reject tuning that would break the reward or catch math.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        let game = &self.game;
        if game.encounter_threshold_secs == 0 {
            return Err(invalid("game.encounter_threshold_secs", "must be positive"));
        }
        if self.developer.encounter_threshold_secs == 0 {
            return Err(invalid("developer.encounter_threshold_secs", "must be positive"));
        }
        for (key, p) in [
            ("game.catch_chance_green", game.catch_chance_green),
            ("game.catch_chance_green_edge", game.catch_chance_green_edge),
            ("game.catch_chance_miss", game.catch_chance_miss),
            ("game.shiny_base", game.shiny_base),
            ("game.shiny_max", game.shiny_max),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(key, "must be a probability between 0 and 1"));
            }
        }
        if game.timing_green_width == 0 || game.timing_green_width > game.timing_bar_width {
            return Err(invalid(
                "game.timing_green_width",
                "must be positive and no wider than the bar",
            ));
        }
        Ok(())
    }

    /// Tuning in effect for the given data namespace.
    pub fn game_for(&self, developer_mode: bool) -> GameConfig {
        if developer_mode {
            GameConfig {
                encounter_threshold_secs: self.developer.encounter_threshold_secs,
                ..self.game.clone()
            }
        } else {
            self.game.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str("[game]\ncoins_per_block = 2\n").unwrap();
        assert_eq!(parsed.game.coins_per_block, 2);
        assert_eq!(parsed.game.encounter_threshold_secs, 300);
        assert_eq!(parsed.developer.pokedex_limit, 20);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("game.encounter_threshold_secs").as_deref(), Some("300"));
        assert_eq!(cfg.get("game.catch_chance_miss").as_deref(), Some("0.3"));
        assert!(cfg.get("game.missing_key").is_none());
        assert!(cfg.get("game").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("game.timing_cursor_speed", "6").unwrap();
        assert_eq!(cfg.game.timing_cursor_speed, 6);
        cfg.set("game.shiny_max", "0.5").unwrap();
        assert_eq!(cfg.game.shiny_max, 0.5);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(cfg.set("game.nonexistent_key", "1").is_err());
        assert!(cfg.set("", "1").is_err());
    }

    #[test]
    fn set_rejects_out_of_range_probability() {
        let mut cfg = Config::default();
        assert!(cfg.set("game.catch_chance_green", "1.5").is_err());
        assert_eq!(cfg.game.catch_chance_green, 0.9);
    }

    #[test]
    fn developer_mode_swaps_threshold_only() {
        let cfg = Config::default();
        let dev = cfg.game_for(true);
        assert_eq!(dev.encounter_threshold_secs, 1);
        assert_eq!(dev.catch_chance_green, cfg.game.catch_chance_green);
        assert_eq!(cfg.game_for(false), cfg.game);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }
}
