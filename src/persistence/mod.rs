//! # Persistence Module
//!
//! Holds everything StikFlash keeps between launches: the user settings blob
//! (key bindings plus three scalar toggles) and the library of imported `.swf`
//! files.
//!
//! ## Key Abstractions
//! - **Settings value object**: [`Settings`] is a plain value with a defined
//!   default. It is loaded and saved as a whole through
//!   [`settings_store::SettingsStore`] and handed to consumers explicitly.
//! - **File library**: [`library::FileLibrary`] owns a private directory and
//!   copies externally granted files into it.
//!
//! ## Error Handling Strategy
//! Loading never fails. A missing or undecodable blob degrades to defaults so
//! the player always comes up with a usable control mapping.

pub mod library;
pub mod settings_store;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// The four on-screen / gamepad buttons that carry a user-chosen key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicalControl {
    #[serde(rename = "space")]
    Space,
    #[serde(rename = "buttonB")]
    ButtonB,
    #[serde(rename = "buttonX")]
    ButtonX,
    #[serde(rename = "buttonY")]
    ButtonY,
}

impl LogicalControl {
    pub const ALL: [LogicalControl; 4] = [
        LogicalControl::Space,
        LogicalControl::ButtonB,
        LogicalControl::ButtonX,
        LogicalControl::ButtonY,
    ];

    /// Name used in the persisted blob.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalControl::Space => "space",
            LogicalControl::ButtonB => "buttonB",
            LogicalControl::ButtonX => "buttonX",
            LogicalControl::ButtonY => "buttonY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Label shown next to the key picker.
    pub fn label(&self) -> &'static str {
        match self {
            LogicalControl::Space => "Space",
            LogicalControl::ButtonB => "ButtonB",
            LogicalControl::ButtonX => "ButtonX",
            LogicalControl::ButtonY => "ButtonY",
        }
    }

    fn default_key(&self) -> &'static str {
        match self {
            LogicalControl::Space => "Space",
            LogicalControl::ButtonB => "KeyB",
            LogicalControl::ButtonX => "KeyX",
            LogicalControl::ButtonY => "KeyY",
        }
    }
}

/// Keys offered by the settings key pickers.
pub const KEY_OPTIONS: [&str; 12] = [
    "Space",
    "KeyA",
    "KeyB",
    "KeyX",
    "KeyY",
    "KeyW",
    "KeyS",
    "KeyD",
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
];

/// Mapping from logical control to symbolic key name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    bindings: BTreeMap<LogicalControl, String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            bindings: LogicalControl::ALL
                .into_iter()
                .map(|c| (c, c.default_key().to_string()))
                .collect(),
        }
    }
}

impl KeyBindings {
    /// Builds bindings from a stored name → key map.
    ///
    /// Unknown control names are dropped and missing controls get their
    /// default key, so every control ends up bound exactly once.
    pub fn from_stored(stored: BTreeMap<String, String>) -> Self {
        let mut bindings = Self::default();
        for (name, key) in stored {
            match LogicalControl::from_name(&name) {
                Some(control) => {
                    bindings.bindings.insert(control, key);
                }
                None => warn!("Ignoring binding for unknown control: {}", name),
            }
        }
        bindings
    }

    pub fn to_stored(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(control, key)| (control.as_str().to_string(), key.to_string()))
            .collect()
    }

    pub fn binding(&self, control: LogicalControl) -> Option<&str> {
        self.bindings.get(&control).map(String::as_str)
    }

    pub fn set(&mut self, control: LogicalControl, key: impl Into<String>) {
        self.bindings.insert(control, key.into());
    }

    /// Removes a binding. Presses of that control become no-ops.
    pub fn unbind(&mut self, control: LogicalControl) {
        self.bindings.remove(&control);
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogicalControl, &str)> {
        self.bindings.iter().map(|(c, k)| (*c, k.as_str()))
    }
}

/// How continuous directional input becomes keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThumbstickMapping {
    #[default]
    #[serde(rename = "Arrow Keys")]
    ArrowKeys,
    #[serde(rename = "WASD")]
    Wasd,
}

impl ThumbstickMapping {
    pub const ALL: [ThumbstickMapping; 2] = [ThumbstickMapping::ArrowKeys, ThumbstickMapping::Wasd];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbstickMapping::ArrowKeys => "Arrow Keys",
            ThumbstickMapping::Wasd => "WASD",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == label)
    }
}

/// User settings, persisted as one blob.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub key_bindings: KeyBindings,
    pub show_controls: bool,
    pub use_direction_pad: bool,
    pub thumbstick_mapping: ThumbstickMapping,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_bindings: KeyBindings::default(),
            show_controls: true,
            use_direction_pad: false,
            thumbstick_mapping: ThumbstickMapping::ArrowKeys,
        }
    }
}

impl Settings {
    /// Restores every setting to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
