// src/config/mod.rs

//! Configuration loading and validation for connector-cycle.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load a settings file from disk, JSON or TOML (`loader.rs`).
//! - Apply defaults and validate basic invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    default_config_path, load_and_validate, load_and_validate_as, load_from_path,
    load_from_path_as, parse_str,
};
pub use model::{
    ConfigFile, ConnectorParams, ConnectorSpec, RawConfigFile, RawConnectorEntry, ServiceSection,
};
