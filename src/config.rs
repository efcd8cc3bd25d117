//! Configuration file support.
//!
//! Settings live in a versioned JSON file, by default
//! `<config dir>/boxmark/config.json`. A missing file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DEBOUNCE_MS, DEFAULT_MAX_HISTORY, MAX_CLASS_HOTKEYS, MIN_BOX_SIZE_PX};
use crate::history::HistoryConfig;
use crate::input::KeyCode;
use crate::keybindings::KeyBindings;
use crate::model::DrawMode;
use crate::session::SessionConfig;
use crate::state::StateConfig;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Keybinding configuration
    #[serde(default)]
    pub keybindings: KeyBindingsConfig,
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Inactivity delay before an automatic save
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Undo steps kept per image
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Smallest accepted box side, in screen pixels
    #[serde(default = "default_min_box_size")]
    pub min_box_size_px: f64,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory holding the datasets
    #[serde(default)]
    pub datasets_root: Option<PathBuf>,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_min_box_size() -> f64 {
    MIN_BOX_SIZE_PX
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_history: default_max_history(),
            min_box_size_px: default_min_box_size(),
            log_level: LogLevel::default(),
            datasets_root: None,
        }
    }
}

/// Keybinding configuration section. Keys are stored by name (`"R"`, `"1"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindingsConfig {
    pub mode_draw: String,
    pub mode_edit: String,
    pub mode_view: String,

    /// Hotkeys for class selection (index 0 = first class)
    #[serde(default = "default_class_hotkeys")]
    pub class_hotkeys: Vec<Option<String>>,
}

fn default_class_hotkeys() -> Vec<Option<String>> {
    crate::keybindings::default_class_hotkeys()
        .iter()
        .map(|key| key.map(|k| k.name().to_string()))
        .collect()
}

impl Default for KeyBindingsConfig {
    fn default() -> Self {
        Self::from(&KeyBindings::default())
    }
}

impl From<&KeyBindings> for KeyBindingsConfig {
    fn from(bindings: &KeyBindings) -> Self {
        Self {
            mode_draw: bindings.mode_draw.name().to_string(),
            mode_edit: bindings.mode_edit.name().to_string(),
            mode_view: bindings.mode_view.name().to_string(),
            class_hotkeys: bindings
                .class_hotkeys
                .iter()
                .map(|key| key.map(|k| k.name().to_string()))
                .collect(),
        }
    }
}

fn parse_key(name: &str) -> Result<KeyCode, ConfigError> {
    KeyCode::from_name(name).ok_or_else(|| ConfigError::InvalidKey {
        key: name.to_string(),
        reason: "unknown key".to_string(),
    })
}

impl KeyBindingsConfig {
    /// Convert to KeyBindings, filling missing class slots with None.
    ///
    /// Fails on unknown key names and on keys bound twice.
    pub fn to_keybindings(&self) -> Result<KeyBindings, ConfigError> {
        let mut bindings = KeyBindings {
            mode_draw: parse_key(&self.mode_draw)?,
            mode_edit: parse_key(&self.mode_edit)?,
            mode_view: parse_key(&self.mode_view)?,
            class_hotkeys: [None; MAX_CLASS_HOTKEYS],
        };

        for &mode in DrawMode::all() {
            let key = bindings.key_for_mode(mode);
            if let Some(conflict) = bindings.key_conflict(key, Some(mode)) {
                return Err(ConfigError::InvalidKey {
                    key: key.name().to_string(),
                    reason: format!("already bound to {}", conflict),
                });
            }
        }

        for (i, name) in self
            .class_hotkeys
            .iter()
            .take(MAX_CLASS_HOTKEYS)
            .enumerate()
        {
            let Some(name) = name else {
                continue;
            };
            let key = parse_key(name)?;
            if let Some(conflict) = bindings.key_conflict(key, None) {
                return Err(ConfigError::InvalidKey {
                    key: name.clone(),
                    reason: format!("already bound to {}", conflict),
                });
            }
            bindings.set_class_key(i, Some(key));
        }

        Ok(bindings)
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            keybindings: KeyBindingsConfig::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("boxmark").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("boxmark")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from the default path, falling back to defaults on any problem.
    pub fn load_from_default_path() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let prefs = &self.preferences;
        Ok(SessionConfig {
            debounce: Duration::from_millis(prefs.debounce_ms),
            state: StateConfig {
                history: HistoryConfig {
                    max_history: prefs.max_history,
                },
                min_box_size: prefs.min_box_size_px,
            },
            keybindings: self.keybindings.to_keybindings()?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unusable keybinding
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}
