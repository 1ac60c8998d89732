// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::engine::ConnectorName;

/// Parameter payload handed to a connector on stdin.
pub type ConnectorParams = Map<String, Value>;

pub const DEFAULT_RUN_INTERVAL_SECONDS: u64 = 5;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Top-level configuration exactly as read from disk.
///
/// JSON settings files may also be a bare array of connector entries, which
/// the loader maps onto this struct with a default `service` section.
///
/// ```toml
/// [service]
/// tick_interval_ms = 100
/// max_workers = 10
///
/// [[connectors]]
/// connector_name = "VTConnector1"
/// run_interval_seconds = 30
/// script_file_path = "connectors/vt.py"
/// interpreter = "python3"
/// params = { source_folder_path = "domains", api_key = "..." }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub connectors: Vec<RawConnectorEntry>,
}

/// `[service]` section: knobs of the orchestration loop itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    /// Pause between two ticks of the coordination loop.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Upper bound of the worker pool draining connector processes.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_workers: default_max_workers(),
        }
    }
}

impl ServiceSection {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Worker pool size for a given number of schedulable connectors:
    /// `min(connectors, max_workers)`, never below one slot.
    pub fn worker_pool_size(&self, connectors: usize) -> usize {
        connectors.min(self.max_workers).max(1)
    }
}

/// One connector entry as written in the settings file.
///
/// Every field is optional here; defaults are applied when the raw file is
/// turned into a [`ConfigFile`]. Entries are read field by field: a value of
/// the wrong type (say `"params": "x"` or `"run_interval_seconds": "10"`) is
/// dropped and recorded in `invalid_fields` instead of failing the whole
/// file, so the field falls back to its default for this entry only.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Value")]
pub struct RawConnectorEntry {
    pub connector_name: Option<String>,
    pub run_interval_seconds: Option<u64>,
    pub output_folder_path: Option<PathBuf>,
    pub script_file_path: Option<PathBuf>,
    pub params: Option<ConnectorParams>,

    /// Program used to run the script (e.g. `python3`). When absent the
    /// script itself is executed.
    pub interpreter: Option<String>,

    /// Per-run wall clock limit. Absent means the child may run forever.
    pub timeout_seconds: Option<u64>,

    /// Keys whose value had the wrong type and was ignored. `"entry"` if the
    /// entry itself is not a table.
    pub invalid_fields: Vec<String>,
}

impl From<Value> for RawConnectorEntry {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self {
                invalid_fields: vec!["entry".to_string()],
                ..Default::default()
            };
        };

        let mut invalid = Vec::new();
        let mut entry = Self {
            connector_name: take_field(&mut fields, "connector_name", &mut invalid),
            run_interval_seconds: take_field(&mut fields, "run_interval_seconds", &mut invalid),
            output_folder_path: take_field(&mut fields, "output_folder_path", &mut invalid),
            script_file_path: take_field(&mut fields, "script_file_path", &mut invalid),
            params: take_field(&mut fields, "params", &mut invalid),
            interpreter: take_field(&mut fields, "interpreter", &mut invalid),
            timeout_seconds: take_field(&mut fields, "timeout_seconds", &mut invalid),
            invalid_fields: Vec::new(),
        };
        entry.invalid_fields = invalid;
        entry
    }
}

/// `null` and missing keys are absent; a mistyped value is absent too but
/// its key lands in `invalid`.
fn take_field<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    key: &str,
    invalid: &mut Vec<String>,
) -> Option<T> {
    match fields.remove(key) {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                invalid.push(key.to_string());
                None
            }
        },
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub service: ServiceSection,
    /// Connectors in settings-file order.
    pub connectors: Vec<ConnectorSpec>,
}

impl ConfigFile {
    /// Build a `ConfigFile` without running validation. Used by
    /// `TryFrom<RawConfigFile>` once the raw file has been checked.
    pub(crate) fn new_unchecked(service: ServiceSection, connectors: Vec<ConnectorSpec>) -> Self {
        Self {
            service,
            connectors,
        }
    }
}

/// Immutable description of one connector.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorSpec {
    pub name: ConnectorName,
    pub run_interval: Duration,
    pub script_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub params: Option<ConnectorParams>,
    pub interpreter: Option<String>,
    pub timeout: Option<Duration>,
}

impl ConnectorSpec {
    /// Resolve a raw entry at position `index` into a spec, applying defaults.
    ///
    /// Empty strings count as absent, so `"connector_name": ""` still gets the
    /// synthesized `Connector{index+1}` name.
    pub fn from_raw(index: usize, raw: &RawConnectorEntry) -> Self {
        let name = raw
            .connector_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Connector{}", index + 1));

        let output_dir = raw
            .output_folder_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(format!("output_folders/{name}_output")));

        Self {
            run_interval: Duration::from_secs(
                raw.run_interval_seconds
                    .unwrap_or(DEFAULT_RUN_INTERVAL_SECONDS),
            ),
            script_path: raw
                .script_file_path
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
            output_dir,
            params: raw.params.clone(),
            interpreter: raw
                .interpreter
                .clone()
                .filter(|s| !s.trim().is_empty()),
            timeout: raw.timeout_seconds.map(Duration::from_secs),
            name,
        }
    }

    /// A spec can only ever be scheduled if it names a script and carries a
    /// parameter payload.
    pub fn is_schedulable(&self) -> bool {
        self.script_path.is_some() && self.params.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_entry_position() {
        let spec = ConnectorSpec::from_raw(2, &RawConnectorEntry::default());

        assert_eq!(spec.name, "Connector3");
        assert_eq!(spec.run_interval, Duration::from_secs(5));
        assert_eq!(spec.output_dir, PathBuf::from("output_folders/Connector3_output"));
        assert!(spec.script_path.is_none());
        assert!(!spec.is_schedulable());
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let raw = RawConnectorEntry {
            connector_name: Some("  ".to_string()),
            script_file_path: Some(PathBuf::new()),
            params: Some(ConnectorParams::new()),
            ..Default::default()
        };
        let spec = ConnectorSpec::from_raw(0, &raw);

        assert_eq!(spec.name, "Connector1");
        assert!(spec.script_path.is_none());
        assert!(!spec.is_schedulable());
    }

    #[test]
    fn empty_params_object_is_still_schedulable() {
        let raw = RawConnectorEntry {
            connector_name: Some("A".to_string()),
            script_file_path: Some(PathBuf::from("echo_ok")),
            params: Some(ConnectorParams::new()),
            run_interval_seconds: Some(1),
            ..Default::default()
        };
        let spec = ConnectorSpec::from_raw(0, &raw);

        assert!(spec.is_schedulable());
        assert_eq!(spec.output_dir, PathBuf::from("output_folders/A_output"));
    }

    #[test]
    fn mistyped_fields_fall_back_to_defaults() {
        let raw: RawConnectorEntry = serde_json::from_str(
            r#"{
                "connector_name": "A",
                "run_interval_seconds": "10",
                "script_file_path": "a.sh",
                "params": "not-an-object",
                "timeout_seconds": -3,
                "interpreter": null
            }"#,
        )
        .unwrap();

        assert_eq!(raw.connector_name.as_deref(), Some("A"));
        assert_eq!(raw.run_interval_seconds, None);
        assert!(raw.params.is_none());
        assert!(raw.interpreter.is_none());
        assert_eq!(
            raw.invalid_fields,
            vec!["run_interval_seconds", "params", "timeout_seconds"]
        );

        let spec = ConnectorSpec::from_raw(0, &raw);
        assert_eq!(spec.run_interval, Duration::from_secs(5));
        assert!(spec.timeout.is_none());
        assert!(!spec.is_schedulable());
    }

    #[test]
    fn non_table_entry_is_recorded_as_invalid() {
        let raw: RawConnectorEntry = serde_json::from_str("42").unwrap();
        assert_eq!(raw.invalid_fields, vec!["entry"]);
        assert!(!ConnectorSpec::from_raw(1, &raw).is_schedulable());
    }

    #[test]
    fn worker_pool_is_capped_and_never_empty() {
        let service = ServiceSection::default();
        assert_eq!(service.worker_pool_size(3), 3);
        assert_eq!(service.worker_pool_size(42), 10);
        assert_eq!(service.worker_pool_size(0), 1);
    }
}
