//! YAML settings loading.

use std::path::Path;

use crate::config::types::SyncSettings;
use crate::error::{Error, Result};

/// Loads and validates sync settings from a YAML file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<SyncSettings> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::ConfigLoad(path.display().to_string(), e.to_string()))?;

    let settings: SyncSettings = serde_yaml::from_str(&content)
        .map_err(|e| Error::ConfigParse(path.display().to_string(), e.to_string()))?;

    settings.validate()?;
    Ok(settings)
}

/// Loads settings from `path` if given, otherwise returns defaults.
pub fn load_settings_or_default(path: Option<&Path>) -> Result<SyncSettings> {
    match path {
        Some(path) => load_settings(path),
        None => Ok(SyncSettings::default()),
    }
}

/// Reads the device IP from the `TAPO_IP` environment variable, if set.
pub fn env_device_ip() -> Option<String> {
    std::env::var("TAPO_IP").ok().filter(|ip| !ip.is_empty())
}
