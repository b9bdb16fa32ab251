use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::schema::Settings;
use crate::error::ConfigError;

const APP_DIR: &str = "docbatch";
const CONFIG_FILE: &str = "config.json";

/// `<platform config dir>/docbatch/config.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Overlays `saved` on `defaults`.
///
/// Objects merge key by key, arrays always come from `defaults` so new option
/// lists reach older files, and saved scalars win. Keys only present in
/// `saved` are kept.
pub fn merge_with_defaults(saved: Value, defaults: Value) -> Value {
    match (saved, defaults) {
        (Value::Object(mut saved), Value::Object(defaults)) => {
            for (key, default) in defaults {
                let merged = match saved.remove(&key) {
                    Some(value) => merge_with_defaults(value, default),
                    None => default,
                };
                saved.insert(key, merged);
            }
            Value::Object(saved)
        }
        (_, defaults @ (Value::Array(_) | Value::Object(_))) => defaults,
        (Value::Null, defaults) => defaults,
        (saved, _) => saved,
    }
}

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let saved: Value = serde_json::from_str(content)?;
    let defaults = serde_json::to_value(Settings::default())?;
    let merged = merge_with_defaults(saved, defaults);

    Ok(serde_json::from_value(merged)?)
}

pub fn save_settings<P: AsRef<Path>>(settings: &Settings, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let write_error = |e: std::io::Error| ConfigError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(write_error)?;

    debug!("Saved settings to {}", path.display());
    Ok(())
}

impl Settings {
    /// Loads `path` merged over the defaults.
    ///
    /// Never fails: a missing file yields the defaults, and an unreadable or
    /// corrupt one is logged and replaced by them.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match load_settings(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Loads from [`default_config_path`].
    pub fn load_default() -> Self {
        match default_config_path() {
            Ok(path) => Self::load(path),
            Err(e) => {
                warn!("{}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        save_settings(self, path)
    }
}
