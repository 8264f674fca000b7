// src/backends/mod.rs

//! Backend descriptors: what to launch, and where to report how it is doing.
//!
//! A backend is an externally supplied executable (e.g. a log shipper). The
//! runners never look inside it; they only need its path, arguments, a label
//! for logs, and a status sink.

use std::fmt;
use std::sync::Mutex;

use tracing::error;

use crate::config::BackendConfig;
use crate::errors::SidecarError;

/// Coarse health reported for a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Unknown,
    Running,
    Stopped,
    Failed,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusKind::Unknown => "unknown",
            StatusKind::Running => "running",
            StatusKind::Stopped => "stopped",
            StatusKind::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Last status reported for a backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BackendStatus {
    pub kind: StatusKind,
    pub message: String,
}

/// Read-only view of one configured backend plus its status sink.
pub trait Backend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    fn exec_path(&self) -> &str;
    fn exec_args(&self) -> &[String];
    /// Runner class tag. Only used as a log label once a runner exists.
    fn driver(&self) -> &str;

    /// Record a new status. Error statuses are not necessarily fatal.
    fn set_status(&self, kind: StatusKind, message: &str);

    fn status(&self) -> BackendStatus;
}

/// Log `message` at error level, mark the backend failed, and hand back an
/// error the caller may propagate or drop.
pub fn set_status_log_error(backend: &dyn Backend, message: impl Into<String>) -> SidecarError {
    let message = message.into();
    error!(backend = %backend.name(), "{}", message);
    backend.set_status(StatusKind::Failed, &message);
    SidecarError::Backend {
        backend: backend.name().to_string(),
        message,
    }
}

/// Backend built from a `[backend.<name>]` config section.
#[derive(Debug)]
pub struct ConfiguredBackend {
    name: String,
    exec_path: String,
    exec_args: Vec<String>,
    driver: String,
    status: Mutex<BackendStatus>,
}

impl ConfiguredBackend {
    pub fn new(
        name: impl Into<String>,
        exec_path: impl Into<String>,
        exec_args: Vec<String>,
        driver: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            exec_path: exec_path.into(),
            exec_args,
            driver: driver.into(),
            status: Mutex::new(BackendStatus::default()),
        }
    }

    pub fn from_config(name: &str, cfg: &BackendConfig) -> Self {
        Self::new(name, &cfg.exec_path, cfg.args.clone(), &cfg.driver)
    }
}

impl Backend for ConfiguredBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn exec_path(&self) -> &str {
        &self.exec_path
    }

    fn exec_args(&self) -> &[String] {
        &self.exec_args
    }

    fn driver(&self) -> &str {
        &self.driver
    }

    fn set_status(&self, kind: StatusKind, message: &str) {
        let mut guard = self.status.lock().unwrap_or_else(|e| e.into_inner());
        *guard = BackendStatus {
            kind,
            message: message.to_string(),
        };
    }

    fn status(&self) -> BackendStatus {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
