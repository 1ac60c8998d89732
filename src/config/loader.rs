// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile, RawConnectorEntry};
use crate::errors::Result;
use crate::types::ConfigFormat;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs deserialization (format guessed from the extension);
/// it does **not** apply defaults or validate. Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    load_from_path_as(path, ConfigFormat::from_path(path))
}

/// Same as [`load_from_path`] with an explicit format.
pub fn load_from_path_as(path: impl AsRef<Path>, format: ConfigFormat) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents, format)
}

/// Deserialize settings text in the given format.
///
/// JSON documents may be either a bare array of connector entries or an
/// object with `service` / `connectors` keys.
pub fn parse_str(contents: &str, format: ConfigFormat) -> Result<RawConfigFile> {
    match format {
        ConfigFormat::Toml => Ok(toml::from_str(contents)?),
        ConfigFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(contents)?;
            if value.is_array() {
                let connectors: Vec<RawConnectorEntry> = serde_json::from_value(value)?;
                Ok(RawConfigFile {
                    connectors,
                    ..Default::default()
                })
            } else {
                Ok(serde_json::from_value(value)?)
            }
        }
    }
}

/// Load a configuration file from path, apply defaults and validate it.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads JSON or TOML.
/// - Resolves every connector entry into a [`ConnectorSpec`](crate::config::ConnectorSpec).
/// - Checks intervals, timeouts, name uniqueness and service limits.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// [`load_and_validate`] with an explicit format.
pub fn load_and_validate_as(path: impl AsRef<Path>, format: ConfigFormat) -> Result<ConfigFile> {
    let raw_config = load_from_path_as(&path, format)?;
    ConfigFile::try_from(raw_config)
}

/// Settings file used when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config/ConnectorsSettingsConfig.json")
}
