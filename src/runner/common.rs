// src/runner/common.rs

use std::sync::{Arc, Mutex};

use crate::backends::Backend;
use crate::config::DaemonConfig;
use crate::context::Context;
use crate::service::ServiceHandle;

/// Fields every runner kind carries.
#[derive(Debug)]
pub struct RunnerCommon {
    pub name: String,
    pub backend: Arc<dyn Backend>,
    pub context: Arc<Context>,
    daemon: Mutex<DaemonConfig>,
    service: Mutex<Option<ServiceHandle>>,
}

impl RunnerCommon {
    pub fn new(backend: Arc<dyn Backend>, context: Arc<Context>) -> Self {
        Self {
            name: backend.name().to_string(),
            backend,
            context,
            daemon: Mutex::new(DaemonConfig::default()),
            service: Mutex::new(None),
        }
    }

    pub fn daemon(&self) -> DaemonConfig {
        self.daemon.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_daemon(&self, daemon: DaemonConfig) {
        *self.daemon.lock().unwrap_or_else(|e| e.into_inner()) = daemon;
    }

    pub fn service(&self) -> Option<ServiceHandle> {
        self.service.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn bind_to_service(&self, service: ServiceHandle) {
        *self.service.lock().unwrap_or_else(|e| e.into_inner()) = Some(service);
    }
}
