// tests/config_loading.rs

mod common;
use crate::common::builders::{BackendConfigBuilder, ConfigFileBuilder};
use crate::common::init_tracing;

use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::NamedTempFile;

use sidecar::config::{SupervisionSection, load_and_validate};
use sidecar::config::ConfigFile;
use sidecar::errors::SidecarError;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

fn expect_config_error(result: Result<ConfigFile, SidecarError>, needle: &str) {
    match result {
        Err(SidecarError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} should mention {needle:?}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn full_config_is_parsed() -> TestResult {
    init_tracing();

    let file = write_config(
        r#"
[sidecar]
log_path = "/var/log/sidecar"
log_rotation_time = "12h"
log_max_age = "48h"
working_dir = "/opt/collector"
env = ["FOO=bar", "OPTS=-Xmx=1g"]

[supervision]
crash_floor = "1s"
forgive_after = "2m"
max_restarts = 5
retry_backoff = "500ms"

[backend.filebeat]
exec_path = "/usr/bin/filebeat"
args = ["-c", "/etc/filebeat.yml"]

[backend.nxlog]
exec_path = "nxlog"
driver = "exec"
enabled = false
"#,
    );

    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.log_path, PathBuf::from("/var/log/sidecar"));
    assert_eq!(cfg.log_rotation_time, Duration::from_secs(12 * 3600));
    assert_eq!(cfg.log_max_age, Duration::from_secs(48 * 3600));
    assert_eq!(cfg.daemon.dir, Some(PathBuf::from("/opt/collector")));
    assert_eq!(
        cfg.daemon.env,
        vec![
            ("FOO".to_string(), "bar".to_string()),
            ("OPTS".to_string(), "-Xmx=1g".to_string()),
        ]
    );

    assert_eq!(cfg.policy.crash_floor, Duration::from_secs(1));
    assert_eq!(cfg.policy.forgive_after, Duration::from_secs(120));
    assert_eq!(cfg.policy.max_restarts, 5);
    assert_eq!(cfg.policy.retry_backoff, Duration::from_millis(500));
    // Unset fields keep their defaults.
    assert_eq!(cfg.policy.shutdown_grace, Duration::from_secs(2));
    assert_eq!(cfg.policy.restart_cooldown, Duration::from_secs(2));

    let filebeat = cfg.backend.get("filebeat").expect("filebeat must exist");
    assert_eq!(filebeat.args, vec!["-c".to_string(), "/etc/filebeat.yml".to_string()]);
    assert_eq!(filebeat.driver, "exec");
    assert!(filebeat.enabled);

    let enabled: Vec<_> = cfg.enabled_backends().map(|(n, _)| n.as_str()).collect();
    assert_eq!(enabled, vec!["filebeat"]);

    Ok(())
}

#[test]
fn minimal_config_gets_defaults() -> TestResult {
    let file = write_config(
        r#"
[backend.shipper]
exec_path = "shipper"
"#,
    );

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.log_path, PathBuf::from("logs"));
    assert_eq!(cfg.log_rotation_time, Duration::from_secs(24 * 3600));
    assert_eq!(cfg.log_max_age, Duration::from_secs(7 * 24 * 3600));
    assert_eq!(cfg.daemon.dir, None);
    assert!(cfg.daemon.env.is_empty());
    assert_eq!(cfg.policy, sidecar::runner::SupervisionPolicy::default());
    Ok(())
}

#[test]
fn config_without_enabled_backends_is_rejected() {
    let file = write_config(
        r#"
[backend.off]
exec_path = "shipper"
enabled = false
"#,
    );
    expect_config_error(load_and_validate(file.path()), "at least one enabled");
}

#[test]
fn empty_exec_path_is_rejected() {
    let file = write_config(
        r#"
[backend.blank]
exec_path = "  "
"#,
    );
    expect_config_error(load_and_validate(file.path()), "empty exec_path");
}

#[test]
fn malformed_env_entry_is_rejected() {
    let file = write_config(
        r#"
[sidecar]
env = ["NOT_AN_ASSIGNMENT"]

[backend.shipper]
exec_path = "shipper"
"#,
    );
    expect_config_error(load_and_validate(file.path()), "KEY=VALUE");
}

#[test]
fn bad_duration_names_the_field() {
    let file = write_config(
        r#"
[supervision]
retry_backoff = "5 parsecs"

[backend.shipper]
exec_path = "shipper"
"#,
    );
    expect_config_error(load_and_validate(file.path()), "supervision.retry_backoff");
}

#[test]
fn forgiveness_must_outlast_crash_floor() {
    let raw = ConfigFileBuilder::new()
        .with_backend("shipper", BackendConfigBuilder::new("shipper").build())
        .supervision(SupervisionSection {
            crash_floor: Some("10s".to_string()),
            forgive_after: Some("5s".to_string()),
            ..Default::default()
        })
        .raw();

    expect_config_error(ConfigFile::try_from(raw), "forgive_after");
}

#[test]
fn invalid_toml_is_a_toml_error() {
    let file = write_config("[backend.shipper\nexec_path = 1");
    match load_and_validate(file.path()) {
        Err(SidecarError::TomlError(_)) => {}
        other => panic!("Expected TomlError, got: {:?}", other),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    match load_and_validate("/definitely/not/here/sidecar.toml") {
        Err(SidecarError::IoError(_)) => {}
        other => panic!("Expected IoError, got: {:?}", other),
    }
}

#[test]
fn oversized_duration_is_a_config_error() {
    let file = write_config(
        r#"
[supervision]
retry_backoff = "18446744073709551615h"

[backend.shipper]
exec_path = "shipper"
"#,
    );
    expect_config_error(load_and_validate(file.path()), "too large");
}
