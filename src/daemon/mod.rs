// src/daemon/mod.rs

//! The service object driven by the service-management layer.
//!
//! `Daemon` turns configured backends into runners (through the registry),
//! binds them to the service handle, and fans `start` / `stop` out to all of
//! them. A backend that fails never takes the daemon down with it; failures
//! are logged and left in that backend's status.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::backends::{Backend, BackendStatus, ConfiguredBackend};
use crate::config::{ConfigFile, DaemonConfig};
use crate::context::Context;
use crate::errors::{Result, SidecarError};
use crate::runner::{Runner, RunnerRegistry};
use crate::service::ServiceHandle;

struct Managed {
    backend: Arc<dyn Backend>,
    runner: Arc<dyn Runner>,
}

pub struct Daemon {
    service: ServiceHandle,
    config: DaemonConfig,
    context: Arc<Context>,
    runners: BTreeMap<String, Managed>,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("service", &self.service)
            .field("runners", &self.runners.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Daemon {
    pub fn new(service: ServiceHandle, config: DaemonConfig, context: Arc<Context>) -> Self {
        Self {
            service,
            config,
            context,
            runners: BTreeMap::new(),
        }
    }

    /// Build a daemon with one runner per enabled backend.
    ///
    /// An unknown driver tag is a configuration error: the backend is never
    /// silently skipped.
    pub fn from_config(
        cfg: &ConfigFile,
        registry: &RunnerRegistry,
        service: ServiceHandle,
    ) -> Result<Self> {
        let mut daemon = Self::new(service, cfg.daemon.clone(), Arc::new(Context::from_config(cfg)));

        for (name, backend_cfg) in cfg.enabled_backends() {
            let backend: Arc<dyn Backend> = Arc::new(ConfiguredBackend::from_config(name, backend_cfg));
            daemon.add_backend(backend, registry).map_err(|e| match e {
                SidecarError::UnknownRunner(tag) => SidecarError::ConfigError(format!(
                    "backend '{}' uses unknown driver '{}'",
                    name, tag
                )),
                other => other,
            })?;
        }

        Ok(daemon)
    }

    /// Construct, configure and bind a runner for `backend`.
    pub fn add_backend(&mut self, backend: Arc<dyn Backend>, registry: &RunnerRegistry) -> Result<()> {
        let name = backend.name().to_string();
        if self.runners.contains_key(&name) {
            return Err(SidecarError::ConfigError(format!(
                "backend '{}' is already managed",
                name
            )));
        }

        let runner = registry.build(Arc::clone(&backend), Arc::clone(&self.context))?;
        runner.set_daemon(self.config.clone());
        runner.bind_to_service(self.service.clone());

        self.runners.insert(name, Managed { backend, runner });
        Ok(())
    }

    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }

    pub fn runner(&self, name: &str) -> Option<Arc<dyn Runner>> {
        self.runners.get(name).map(|m| Arc::clone(&m.runner))
    }

    pub fn runner_names(&self) -> impl Iterator<Item = &str> {
        self.runners.keys().map(String::as_str)
    }

    pub fn statuses(&self) -> Vec<(String, BackendStatus)> {
        self.runners
            .iter()
            .map(|(name, m)| (name.clone(), m.backend.status()))
            .collect()
    }

    /// Start every runner. Returns the names of the ones that refused to start.
    pub async fn start(&self) -> Vec<String> {
        info!(service = %self.service, backends = self.runners.len(), "starting backends");

        let mut failed = Vec::new();
        for (name, managed) in self.runners.iter() {
            if let Err(e) = managed.runner.start(&self.service).await {
                error!(backend = %name, error = %e, "backend failed to start");
                failed.push(name.clone());
            }
        }

        if !failed.is_empty() {
            warn!(?failed, "some backends are not running");
        }
        failed
    }

    /// Stop every runner concurrently and wait until all have ceased.
    pub async fn stop(&self) {
        info!(service = %self.service, "stopping backends");

        let mut set = JoinSet::new();
        for managed in self.runners.values() {
            let runner = Arc::clone(&managed.runner);
            let service = self.service.clone();
            set.spawn(async move {
                let result = runner.stop(&service).await;
                (runner.name().to_string(), result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(e))) => error!(backend = %name, error = %e, "backend failed to stop"),
                Err(e) => error!(error = %e, "stop task panicked"),
            }
        }

        info!(service = %self.service, "all backends stopped");
    }

    pub async fn restart_backend(&self, name: &str) -> Result<()> {
        let managed = self
            .runners
            .get(name)
            .ok_or_else(|| SidecarError::ConfigError(format!("no backend named '{}'", name)))?;
        managed.runner.restart(&self.service).await
    }
}
