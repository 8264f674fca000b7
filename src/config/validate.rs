// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, DaemonConfig, RawConfigFile, SupervisionSection};
use crate::errors::{Result, SidecarError};
use crate::runner::policy::SupervisionPolicy;
use crate::types::{parse_duration, parse_env_assignment};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SidecarError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;

        let log_rotation_time = duration_field("sidecar.log_rotation_time", &raw.sidecar.log_rotation_time)?;
        let log_max_age = duration_field("sidecar.log_max_age", &raw.sidecar.log_max_age)?;
        let env = raw
            .sidecar
            .env
            .iter()
            .map(|e| parse_env_assignment(e).map_err(SidecarError::ConfigError))
            .collect::<Result<Vec<_>>>()?;
        let policy = build_policy(&raw.supervision)?;

        Ok(ConfigFile {
            log_path: raw.sidecar.log_path,
            log_rotation_time,
            log_max_age,
            daemon: DaemonConfig {
                dir: raw.sidecar.working_dir,
                env,
            },
            policy,
            backend: raw.backend,
        })
    }
}

/// Check the invariants that `ConfigFile` relies on.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_backends(cfg)?;
    validate_backends(cfg)?;
    validate_sidecar_section(cfg)?;
    Ok(())
}

fn ensure_has_backends(cfg: &RawConfigFile) -> Result<()> {
    if !cfg.backend.values().any(|b| b.enabled) {
        return Err(SidecarError::ConfigError(
            "config must contain at least one enabled [backend.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_backends(cfg: &RawConfigFile) -> Result<()> {
    for (name, backend) in cfg.backend.iter() {
        if name.contains(['/', '\\']) {
            return Err(SidecarError::ConfigError(format!(
                "backend name '{}' must not contain path separators",
                name
            )));
        }
        if backend.exec_path.trim().is_empty() {
            return Err(SidecarError::ConfigError(format!(
                "backend '{}' has an empty exec_path",
                name
            )));
        }
        if backend.driver.trim().is_empty() {
            return Err(SidecarError::ConfigError(format!(
                "backend '{}' has an empty driver",
                name
            )));
        }
    }
    Ok(())
}

fn validate_sidecar_section(cfg: &RawConfigFile) -> Result<()> {
    for entry in cfg.sidecar.env.iter() {
        parse_env_assignment(entry).map_err(SidecarError::ConfigError)?;
    }
    duration_field("sidecar.log_rotation_time", &cfg.sidecar.log_rotation_time)?;
    duration_field("sidecar.log_max_age", &cfg.sidecar.log_max_age)?;
    Ok(())
}

fn build_policy(section: &SupervisionSection) -> Result<SupervisionPolicy> {
    let mut policy = SupervisionPolicy::default();

    if let Some(ref s) = section.crash_floor {
        policy.crash_floor = duration_field("supervision.crash_floor", s)?;
    }
    if let Some(ref s) = section.forgive_after {
        policy.forgive_after = duration_field("supervision.forgive_after", s)?;
    }
    if let Some(n) = section.max_restarts {
        policy.max_restarts = n;
    }
    if let Some(ref s) = section.retry_backoff {
        policy.retry_backoff = duration_field("supervision.retry_backoff", s)?;
    }
    if let Some(ref s) = section.shutdown_grace {
        policy.shutdown_grace = duration_field("supervision.shutdown_grace", s)?;
    }
    if let Some(ref s) = section.restart_cooldown {
        policy.restart_cooldown = duration_field("supervision.restart_cooldown", s)?;
    }

    if policy.forgive_after <= policy.crash_floor {
        return Err(SidecarError::ConfigError(format!(
            "supervision.forgive_after ({:?}) must be longer than supervision.crash_floor ({:?})",
            policy.forgive_after, policy.crash_floor
        )));
    }

    Ok(policy)
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| SidecarError::ConfigError(format!("[{}] {}", field, e)))
}
