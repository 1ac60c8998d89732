#![allow(dead_code)]

use std::path::PathBuf;

use connector_cycle::config::{ConfigFile, RawConfigFile, RawConnectorEntry, ServiceSection};
use serde_json::Value;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_connector(mut self, entry: RawConnectorEntry) -> Self {
        self.config.connectors.push(entry);
        self
    }

    pub fn with_service(mut self, tick_interval_ms: u64, max_workers: usize) -> Self {
        self.config.service = ServiceSection {
            tick_interval_ms,
            max_workers,
        };
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawConnectorEntry`.
///
/// Starts out schedulable: a script path `connector.sh`, empty params, a one
/// second interval and an output folder under `out/`.
pub struct ConnectorEntryBuilder {
    entry: RawConnectorEntry,
}

impl ConnectorEntryBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            entry: RawConnectorEntry {
                connector_name: Some(name.to_string()),
                run_interval_seconds: Some(1),
                output_folder_path: Some(PathBuf::from(format!("out/{name}"))),
                script_file_path: Some(PathBuf::from("connector.sh")),
                params: Some(Default::default()),
                interpreter: None,
                timeout_seconds: None,
                invalid_fields: Vec::new(),
            },
        }
    }

    /// Entry without a name, so the loader synthesizes `Connector{n}`.
    pub fn unnamed() -> Self {
        let mut b = Self::new("unused");
        b.entry.connector_name = None;
        b.entry.output_folder_path = None;
        b
    }

    pub fn interval(mut self, seconds: u64) -> Self {
        self.entry.run_interval_seconds = Some(seconds);
        self
    }

    pub fn output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.entry.output_folder_path = Some(dir.into());
        self
    }

    pub fn script(mut self, path: impl Into<PathBuf>) -> Self {
        self.entry.script_file_path = Some(path.into());
        self
    }

    pub fn no_script(mut self) -> Self {
        self.entry.script_file_path = None;
        self
    }

    /// Set params from a JSON object literal. Non-objects are ignored.
    pub fn params(mut self, params: Value) -> Self {
        self.entry.params = params.as_object().cloned();
        self
    }

    pub fn no_params(mut self) -> Self {
        self.entry.params = None;
        self
    }

    pub fn interpreter(mut self, program: &str) -> Self {
        self.entry.interpreter = Some(program.to_string());
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.entry.timeout_seconds = Some(seconds);
        self
    }

    pub fn build(self) -> RawConnectorEntry {
        self.entry
    }
}
