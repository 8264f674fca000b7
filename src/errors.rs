// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Runner already registered for backend class: {0}")]
    DuplicateRunner(String),

    #[error("Unknown backend class: {0}")]
    UnknownRunner(String),

    #[error("[{backend}] {message}")]
    Backend { backend: String, message: String },
}

pub type Result<T> = std::result::Result<T, SidecarError>;
