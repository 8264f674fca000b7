// src/config/mod.rs

//! Configuration loading and validation for the sidecar.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it and turn the raw model into a typed `ConfigFile`
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    BackendConfig, ConfigFile, DaemonConfig, RawConfigFile, SidecarSection, SupervisionSection,
};
pub use validate::validate_config;
