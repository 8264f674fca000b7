// src/context.rs

//! Execution context shared by every runner.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigFile;
use crate::runner::policy::SupervisionPolicy;

/// Paths, log rotation settings and the supervision policy.
#[derive(Debug, Clone)]
pub struct Context {
    pub log_path: PathBuf,
    pub log_rotation_time: Duration,
    pub log_max_age: Duration,
    pub policy: SupervisionPolicy,
}

impl Context {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            log_path: cfg.log_path.clone(),
            log_rotation_time: cfg.log_rotation_time,
            log_max_age: cfg.log_max_age,
            policy: cfg.policy,
        }
    }

    /// Log files for a backend: `(stderr, stdout)`.
    pub fn backend_log_paths(&self, backend_name: &str) -> (PathBuf, PathBuf) {
        (
            self.log_path.join(format!("{backend_name}_stderr.log")),
            self.log_path.join(format!("{backend_name}_stdout.log")),
        )
    }
}

impl Default for Context {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("logs"),
            log_rotation_time: Duration::from_secs(24 * 60 * 60),
            log_max_age: Duration::from_secs(7 * 24 * 60 * 60),
            policy: SupervisionPolicy::default(),
        }
    }
}
