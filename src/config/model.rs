// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::runner::policy::SupervisionPolicy;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [sidecar]
/// log_path = "/var/log/sidecar"
/// log_rotation_time = "24h"
/// env = ["FOO=bar"]
///
/// [supervision]
/// max_restarts = 3
///
/// [backend.filebeat]
/// exec_path = "/usr/bin/filebeat"
/// args = ["-c", "/etc/filebeat.yml"]
/// ```
///
/// Every section except `[backend.<name>]` is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub sidecar: SidecarSection,

    #[serde(default)]
    pub supervision: SupervisionSection,

    /// Keys are the backend names; they become runner names and log file
    /// prefixes.
    #[serde(default)]
    pub backend: BTreeMap<String, BackendConfig>,
}

/// `[sidecar]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SidecarSection {
    /// Directory holding `<backend>_stdout.log` / `<backend>_stderr.log`.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    #[serde(default = "default_log_rotation_time")]
    pub log_rotation_time: String,

    #[serde(default = "default_log_max_age")]
    pub log_max_age: String,

    /// Working directory for every backend process. Unset means inherit.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// `KEY=VALUE` pairs laid over the inherited environment, in order.
    #[serde(default)]
    pub env: Vec<String>,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_rotation_time() -> String {
    "24h".to_string()
}

fn default_log_max_age() -> String {
    "168h".to_string()
}

impl Default for SidecarSection {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            log_rotation_time: default_log_rotation_time(),
            log_max_age: default_log_max_age(),
            working_dir: None,
            env: Vec::new(),
        }
    }
}

/// `[supervision]` section. Unset fields keep the built-in policy values.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SupervisionSection {
    #[serde(default)]
    pub crash_floor: Option<String>,
    #[serde(default)]
    pub forgive_after: Option<String>,
    #[serde(default)]
    pub max_restarts: Option<u32>,
    #[serde(default)]
    pub retry_backoff: Option<String>,
    #[serde(default)]
    pub shutdown_grace: Option<String>,
    #[serde(default)]
    pub restart_cooldown: Option<String>,
}

/// `[backend.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Executable to launch; bare names are resolved on `PATH`.
    pub exec_path: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Runner class tag looked up in the runner registry.
    #[serde(default = "default_driver")]
    pub driver: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_driver() -> String {
    "exec".to_string()
}

fn default_enabled() -> bool {
    true
}

/// Daemon-wide settings every runner applies to its child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonConfig {
    pub dir: Option<PathBuf>,
    /// Ordered `(key, value)` overlay; later entries win.
    pub env: Vec<(String, String)>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub log_path: PathBuf,
    pub log_rotation_time: Duration,
    pub log_max_age: Duration,
    pub daemon: DaemonConfig,
    pub policy: SupervisionPolicy,
    pub backend: BTreeMap<String, BackendConfig>,
}

impl ConfigFile {
    /// Backends with `enabled = true`, in name order.
    pub fn enabled_backends(&self) -> impl Iterator<Item = (&String, &BackendConfig)> {
        self.backend.iter().filter(|(_, b)| b.enabled)
    }
}
