#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sidecar::config::{BackendConfig, ConfigFile, RawConfigFile, SidecarSection, SupervisionSection};
use sidecar::context::Context;
use sidecar::runner::SupervisionPolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                sidecar: SidecarSection::default(),
                supervision: SupervisionSection::default(),
                backend: BTreeMap::new(),
            },
        }
    }

    pub fn with_backend(mut self, name: &str, backend: BackendConfig) -> Self {
        self.config.backend.insert(name.to_string(), backend);
        self
    }

    pub fn log_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.sidecar.log_path = path.as_ref().to_path_buf();
        self
    }

    pub fn env(mut self, assignment: &str) -> Self {
        self.config.sidecar.env.push(assignment.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.sidecar.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn supervision(mut self, section: SupervisionSection) -> Self {
        self.config.supervision = section;
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

/// Builder for `BackendConfig`.
pub struct BackendConfigBuilder {
    backend: BackendConfig,
}

impl BackendConfigBuilder {
    pub fn new(exec_path: &str) -> Self {
        Self {
            backend: BackendConfig {
                exec_path: exec_path.to_string(),
                args: vec![],
                driver: "exec".to_string(),
                enabled: true,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.backend.args.push(arg.to_string());
        self
    }

    pub fn driver(mut self, driver: &str) -> Self {
        self.backend.driver = driver.to_string();
        self
    }

    pub fn enabled(mut self, val: bool) -> Self {
        self.backend.enabled = val;
        self
    }

    pub fn build(self) -> BackendConfig {
        self.backend
    }
}

/// Policy with the default shape but millisecond-scale timings.
pub fn fast_policy() -> SupervisionPolicy {
    SupervisionPolicy {
        crash_floor: Duration::from_millis(100),
        forgive_after: Duration::from_millis(400),
        max_restarts: 3,
        retry_backoff: Duration::from_millis(50),
        shutdown_grace: Duration::from_millis(300),
        restart_cooldown: Duration::from_millis(50),
    }
}

/// Context logging into `log_dir` with rotation off and the given policy.
pub fn test_context(log_dir: impl AsRef<Path>, policy: SupervisionPolicy) -> Arc<Context> {
    Arc::new(Context {
        log_path: log_dir.as_ref().to_path_buf(),
        log_rotation_time: Duration::ZERO,
        log_max_age: Duration::ZERO,
        policy,
    })
}
