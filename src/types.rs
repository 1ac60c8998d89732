use std::path::Path;
use std::str::FromStr;

/// On-disk format of the connectors configuration file.
///
/// - `Json`: the settings file format the service has always used, either a
///   bare array of connector entries or an object with `service` and
///   `connectors` keys.
/// - `Toml`: `[service]` plus `[[connectors]]` tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Json,
    Toml,
}

impl ConfigFormat {
    /// Guess the format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

impl FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            other => Err(format!(
                "invalid config format: {other} (expected \"json\" or \"toml\")"
            )),
        }
    }
}

/// Exit codes defined by the connector process contract.
pub mod exit_code {
    /// Connector produced a JSON result payload on stdout.
    pub const SUCCESS: i32 = 0;
    /// Transient failure; the connector is retried on its normal interval.
    pub const RECOVERABLE: i32 = 1;
    /// Structural failure; the connector is removed from the schedule.
    pub const UNRECOVERABLE: i32 = 2;
    /// Reported when the child was terminated by a signal.
    pub const TERMINATED: i32 = -1;
}
