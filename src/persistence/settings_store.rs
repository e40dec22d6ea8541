//! Load/save entry points for the [`Settings`] blob.
//!
//! The blob is a TOML document:
//!
//! ```toml
//! showControls = true
//! useDirectionPad = false
//! thumbstickMapping = "Arrow Keys"
//!
//! [keyBindings]
//! buttonB = "KeyB"
//! buttonX = "KeyX"
//! buttonY = "KeyY"
//! space = "Space"
//! ```
//!
//! Each entry decodes on its own; a bad entry only resets that entry.

use super::{KeyBindings, Settings, ThumbstickMapping};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const KEY_BINDINGS: &str = "keyBindings";
const SHOW_CONTROLS: &str = "showControls";
const USE_DIRECTION_PAD: &str = "useDirectionPad";
const THUMBSTICK_MAPPING: &str = "thumbstickMapping";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Serialize)]
struct StoredSettings<'a> {
    #[serde(rename = "showControls")]
    show_controls: bool,
    #[serde(rename = "useDirectionPad")]
    use_direction_pad: bool,
    #[serde(rename = "thumbstickMapping")]
    thumbstick_mapping: &'a str,
    // tables go last in TOML
    #[serde(rename = "keyBindings")]
    key_bindings: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the blob. Never fails: anything unreadable becomes a default.
    pub fn load(&self) -> Settings {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", self.path.display());
                return Settings::default();
            }
            Err(e) => {
                warn!("Failed to read settings {}: {}", self.path.display(), e);
                return Settings::default();
            }
        };

        let table: toml::Table = match content.parse() {
            Ok(table) => table,
            Err(e) => {
                warn!("Failed to parse settings {}: {}", self.path.display(), e);
                return Settings::default();
            }
        };

        let settings = decode(&table);
        info!("Settings loaded from {}", self.path.display());
        settings
    }

    /// Writes the whole blob, replacing whatever was there.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let stored = StoredSettings {
            show_controls: settings.show_controls,
            use_direction_pad: settings.use_direction_pad,
            thumbstick_mapping: settings.thumbstick_mapping.as_str(),
            key_bindings: settings.key_bindings.to_stored(),
        };
        let content = toml::to_string_pretty(&stored)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, content).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

fn decode(table: &toml::Table) -> Settings {
    let defaults = Settings::default();

    let key_bindings = match table.get(KEY_BINDINGS) {
        Some(value) => match value.clone().try_into::<BTreeMap<String, String>>() {
            Ok(stored) => KeyBindings::from_stored(stored),
            Err(e) => {
                warn!("Failed to decode key bindings, using defaults: {}", e);
                defaults.key_bindings
            }
        },
        None => defaults.key_bindings,
    };

    let thumbstick_mapping = match table.get(THUMBSTICK_MAPPING) {
        Some(toml::Value::String(label)) => ThumbstickMapping::from_label(label)
            .unwrap_or_else(|| {
                warn!("Unknown thumbstick mapping {:?}, using default", label);
                defaults.thumbstick_mapping
            }),
        Some(other) => {
            warn!("Invalid thumbstick mapping value: {}", other);
            defaults.thumbstick_mapping
        }
        None => defaults.thumbstick_mapping,
    };

    Settings {
        key_bindings,
        show_controls: read_bool(table, SHOW_CONTROLS, defaults.show_controls),
        use_direction_pad: read_bool(table, USE_DIRECTION_PAD, defaults.use_direction_pad),
        thumbstick_mapping,
    }
}

fn read_bool(table: &toml::Table, key: &str, default: bool) -> bool {
    match table.get(key) {
        Some(toml::Value::Boolean(value)) => *value,
        Some(other) => {
            warn!("Invalid value for {}: {}", key, other);
            default
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::LogicalControl;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("nested").join("settings.toml"))
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir).load(), Settings::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut settings = Settings::default();
        settings.show_controls = false;
        settings.use_direction_pad = true;
        settings.thumbstick_mapping = ThumbstickMapping::Wasd;
        settings.key_bindings.set(LogicalControl::ButtonX, "ArrowLeft");

        store.save(&settings).unwrap();
        assert_eq!(store.load(), settings);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("thumbstickMapping = \"WASD\""));
        assert!(raw.contains("[keyBindings]"));
    }

    #[test]
    fn undecodable_bindings_fall_back_but_scalars_survive() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            "showControls = false\nkeyBindings = [1, 2, 3]\n",
        )
        .unwrap();

        let settings = store.load();
        assert!(!settings.show_controls);
        assert_eq!(settings.key_bindings, KeyBindings::default());
    }

    #[test]
    fn garbage_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "this is = = not toml").unwrap();

        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn last_save_wins() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut first = Settings::default();
        first.show_controls = false;
        store.save(&first).unwrap();

        let mut second = Settings::default();
        second.use_direction_pad = true;
        store.save(&second).unwrap();

        assert_eq!(store.load(), second);
    }
}
