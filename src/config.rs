//! Application configuration.
//!
//! Everything here is read once at startup from `~/.config/stikflash/config.toml`.
//! A missing or broken file falls back to [`AppConfig::default`]; the app never
//! refuses to start because of its own config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = ".config/stikflash";
const CONFIG_FILE: &str = "config.toml";
const SETTINGS_FILE: &str = "settings.toml";
const LIBRARY_DIR: &str = "StikFlash/ImportedFiles";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub controller: ControllerConfig,
    pub paths: PathConfig,
}

/// Loopback content server settings.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port on 127.0.0.1. `0` lets the OS pick one.
    pub port: u16,
    /// Delay between swapping the served file and asking the page to reload.
    pub reload_delay_ms: u64,
    /// Open the player page in the default browser once the server is up.
    pub open_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            reload_delay_ms: 500,
            open_on_start: true,
        }
    }
}

/// Gamepad polling settings.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub poll_interval_us: u64,
    /// Axis magnitude at which a thumbstick direction counts as pressed.
    pub stick_press_threshold: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_us: 100,
            stick_press_threshold: 0.5,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct PathConfig {
    pub settings_file: Option<PathBuf>,
    pub library_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads the config file, falling back to defaults on any problem.
    pub fn load() -> Self {
        let path = config_dir().join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let config: Self = toml::from_str(content)?;
        info!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Where the persisted user settings blob lives.
    pub fn settings_path(&self) -> PathBuf {
        self.paths
            .settings_file
            .clone()
            .unwrap_or_else(|| config_dir().join(SETTINGS_FILE))
    }

    /// Private directory imported files are copied into.
    pub fn library_dir(&self) -> PathBuf {
        self.paths.library_dir.clone().unwrap_or_else(|| {
            dirs::document_dir()
                .unwrap_or_else(get_home_dir)
                .join(LIBRARY_DIR)
        })
    }
}

fn config_dir() -> PathBuf {
    get_home_dir().join(CONFIG_DIR)
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.reload_delay_ms, 500);
        assert!(config.server.open_on_start);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = AppConfig::parse(
            r#"
            [server]
            port = 9000

            [paths]
            library_dir = "/tmp/swf"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.reload_delay_ms, 500);
        assert_eq!(config.controller, ControllerConfig::default());
        assert_eq!(config.library_dir(), PathBuf::from("/tmp/swf"));
    }

    #[test]
    fn opening_the_player_can_be_disabled() {
        let config = AppConfig::parse("[server]\nopen_on_start = false").unwrap();
        assert!(!config.server.open_on_start);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(AppConfig::parse("[server]\nport = \"eighty\"").is_err());
    }
}
