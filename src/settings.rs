//! Game settings and preferences
//!
//! Persisted separately from game saves as a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_LEVEL;
use crate::persistence::{PersistentStorage, Result};
use crate::platform::ScriptedLevels;
use crate::sim::{GameState, ShapeFactory};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Saves ===
    /// Directory holding the save slots
    pub save_dir: PathBuf,
    /// Save slot (0 = `saveFile`)
    pub save_slot: u32,

    // === Simulation ===
    /// Seed for the main generator that seeds every new game
    pub seed: u64,
    /// Level loaded at start-up
    pub start_level: i32,
    /// Shapes created per second
    pub creation_speed: f32,
    /// Shapes destroyed per second
    pub destruction_speed: f32,
    /// Spin cap for new shapes (radians/sec)
    pub max_angular_speed: f32,
    /// Drift cap for new shapes (units/sec)
    pub max_linear_speed: f32,
    /// Pool reclaimed shapes instead of dropping them
    pub recycle_shapes: bool,
    /// Keep playing with fresh randomness after a load
    pub reseed_on_load: bool,

    // === Level host ===
    /// Frames a level load takes to complete
    pub level_load_delay: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("."),
            save_slot: 0,

            seed: 0x5eed,
            start_level: DEFAULT_LEVEL,
            creation_speed: 0.0,
            destruction_speed: 0.0,
            max_angular_speed: std::f32::consts::FRAC_PI_2,
            max_linear_speed: 0.0,
            recycle_shapes: true,
            reseed_on_load: false,

            level_load_delay: 2,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return Self::sanitized(settings);
                }
                Err(err) => log::warn!("Ignoring malformed settings {}: {}", path.display(), err),
            },
            Err(err) => log::debug!("No settings at {}: {}", path.display(), err),
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Replace out-of-range rates and speed caps with their defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.creation_speed =
            non_negative("creation_speed", self.creation_speed, defaults.creation_speed);
        self.destruction_speed = non_negative(
            "destruction_speed",
            self.destruction_speed,
            defaults.destruction_speed,
        );
        self.max_angular_speed = non_negative(
            "max_angular_speed",
            self.max_angular_speed,
            defaults.max_angular_speed,
        );
        self.max_linear_speed = non_negative(
            "max_linear_speed",
            self.max_linear_speed,
            defaults.max_linear_speed,
        );
        self
    }

    /// Save settings as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// The configured save slot
    pub fn storage(&self) -> PersistentStorage {
        PersistentStorage::slot(&self.save_dir, self.save_slot)
    }

    /// Fresh game state with these spawn rates and limits, no level loaded
    pub fn new_game_state(&self) -> GameState {
        let settings = self.clone().sanitized();
        let factory = ShapeFactory::default().with_recycle(settings.recycle_shapes);
        let mut state = GameState::with_factory(settings.seed, factory);
        state.creation_speed = settings.creation_speed;
        state.destruction_speed = settings.destruction_speed;
        state.max_angular_speed = settings.max_angular_speed;
        state.max_linear_speed = settings.max_linear_speed;
        state.reseed_on_load = settings.reseed_on_load;
        state
    }

    /// Built-in levels served with the configured delay
    pub fn levels(&self) -> ScriptedLevels {
        ScriptedLevels::builtin(self.level_load_delay)
    }
}

fn non_negative(name: &str, value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        log::warn!("Setting {} = {} is out of range, using {}", name, value, fallback);
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            save_slot: 3,
            creation_speed: 4.0,
            reseed_on_load: true,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "seed": 7, "destruction_speed": 1.5 }"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.destruction_speed, 1.5);
        assert_eq!(settings.start_level, DEFAULT_LEVEL);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_new_game_state_applies_settings() {
        let settings = Settings {
            creation_speed: 2.0,
            max_linear_speed: 3.0,
            recycle_shapes: false,
            ..Default::default()
        };
        let mut state = settings.new_game_state();
        assert_eq!(state.creation_speed, 2.0);
        assert_eq!(state.max_linear_speed, 3.0);

        state.create_shape();
        state.destroy_shape();
        assert_eq!(state.factory.pooled_count(), 0);
    }

    #[test]
    fn test_negative_speeds_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "max_angular_speed": -1.0, "max_linear_speed": -3.0, "creation_speed": -2.0 }"#,
        )
        .unwrap();

        let settings = Settings::load(&path);
        let defaults = Settings::default();
        assert_eq!(settings.max_angular_speed, defaults.max_angular_speed);
        assert_eq!(settings.max_linear_speed, defaults.max_linear_speed);
        assert_eq!(settings.creation_speed, defaults.creation_speed);
    }

    #[test]
    fn test_invalid_caps_still_spawn() {
        let settings = Settings {
            max_angular_speed: -1.0,
            max_linear_speed: f32::NAN,
            destruction_speed: f32::INFINITY,
            ..Default::default()
        };
        let mut state = settings.new_game_state();
        assert_eq!(state.max_angular_speed, std::f32::consts::FRAC_PI_2);
        assert_eq!(state.max_linear_speed, 0.0);
        assert_eq!(state.destruction_speed, 0.0);
        state.create_shape();
        assert_eq!(state.shape_count(), 1);
    }

    #[test]
    fn test_storage_uses_slot() {
        let settings = Settings {
            save_dir: PathBuf::from("saves"),
            save_slot: 2,
            ..Default::default()
        };
        assert_eq!(settings.storage().path(), Path::new("saves/saveFile2"));
    }
}
