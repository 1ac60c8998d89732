// src/config/validate.rs

use std::collections::HashSet;

use tracing::warn;

use crate::config::model::{ConfigFile, ConnectorSpec, RawConfigFile};
use crate::errors::{CycleError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::CycleError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let connectors: Vec<ConnectorSpec> = raw
            .connectors
            .iter()
            .enumerate()
            .map(|(index, entry)| ConnectorSpec::from_raw(index, entry))
            .collect();
        ensure_unique_names(&connectors)?;
        warn_invalid_fields(&raw, &connectors);

        Ok(ConfigFile::new_unchecked(raw.service, connectors))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_connectors(cfg)?;
    validate_service_section(cfg)?;
    validate_connector_entries(cfg)?;
    Ok(())
}

fn ensure_has_connectors(cfg: &RawConfigFile) -> Result<()> {
    if cfg.connectors.is_empty() {
        return Err(CycleError::ConfigError(
            "config must contain at least one connector entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_service_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.service.max_workers == 0 {
        return Err(CycleError::ConfigError(
            "[service].max_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.service.tick_interval_ms == 0 {
        return Err(CycleError::ConfigError(
            "[service].tick_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_connector_entries(cfg: &RawConfigFile) -> Result<()> {
    for (index, entry) in cfg.connectors.iter().enumerate() {
        let label = entry
            .connector_name
            .clone()
            .unwrap_or_else(|| format!("#{}", index + 1));

        if entry.run_interval_seconds == Some(0) {
            return Err(CycleError::ConfigError(format!(
                "connector '{label}': run_interval_seconds must be a positive integer"
            )));
        }
        if entry.timeout_seconds == Some(0) {
            return Err(CycleError::ConfigError(format!(
                "connector '{label}': timeout_seconds must be a positive integer"
            )));
        }
    }
    Ok(())
}

fn warn_invalid_fields(raw: &RawConfigFile, connectors: &[ConnectorSpec]) {
    for (entry, spec) in raw.connectors.iter().zip(connectors) {
        if !entry.invalid_fields.is_empty() {
            warn!(
                connector = %spec.name,
                fields = ?entry.invalid_fields,
                "settings with an invalid type were ignored; using defaults"
            );
        }
    }
}

fn ensure_unique_names(connectors: &[ConnectorSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in connectors {
        if !seen.insert(spec.name.as_str()) {
            return Err(CycleError::ConfigError(format!(
                "duplicate connector name '{}'",
                spec.name
            )));
        }
    }
    Ok(())
}
