// src/runner/registry.rs

//! Backend class tag → runner constructor table.
//!
//! The process-wide table is built once by [`init`] before any configuration
//! is processed and is read-only afterwards, so lookups need no locking.
//! Registering the same tag twice is a wiring bug and fails loudly.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::backends::Backend;
use crate::context::Context;
use crate::errors::{Result, SidecarError};

use super::Runner;
use super::exec::new_exec_runner;

/// Builds a runner for one backend.
pub type RunnerConstructor = fn(Arc<dyn Backend>, Arc<Context>) -> Arc<dyn Runner>;

#[derive(Debug, Default, Clone)]
pub struct RunnerRegistry {
    constructors: BTreeMap<String, RunnerConstructor>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the runner kinds shipped with the sidecar.
    pub fn with_builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register("exec", new_exec_runner)?;
        Ok(registry)
    }

    pub fn register(&mut self, tag: &str, constructor: RunnerConstructor) -> Result<()> {
        if self.constructors.contains_key(tag) {
            return Err(SidecarError::DuplicateRunner(tag.to_string()));
        }
        debug!(tag, "registered backend runner");
        self.constructors.insert(tag.to_string(), constructor);
        Ok(())
    }

    pub fn lookup(&self, tag: &str) -> Result<RunnerConstructor> {
        self.constructors
            .get(tag)
            .copied()
            .ok_or_else(|| SidecarError::UnknownRunner(tag.to_string()))
    }

    /// Construct a runner for `backend`, keyed by its driver tag.
    pub fn build(&self, backend: Arc<dyn Backend>, context: Arc<Context>) -> Result<Arc<dyn Runner>> {
        let constructor = self.lookup(backend.driver())?;
        Ok(constructor(backend, context))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

static GLOBAL: OnceLock<RunnerRegistry> = OnceLock::new();

/// Build and install the process-wide registry. Calling it again returns the
/// already installed table.
pub fn init() -> Result<&'static RunnerRegistry> {
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let registry = RunnerRegistry::with_builtin()?;
    Ok(GLOBAL.get_or_init(|| registry))
}

/// The process-wide registry; errors if [`init`] has not run.
pub fn global() -> Result<&'static RunnerRegistry> {
    GLOBAL
        .get()
        .ok_or_else(|| SidecarError::ConfigError("runner registry is not initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ConfiguredBackend;

    #[test]
    fn builtin_registry_knows_exec() {
        let registry = RunnerRegistry::with_builtin().unwrap();
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["exec"]);
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let mut registry = RunnerRegistry::with_builtin().unwrap();
        match registry.register("exec", new_exec_runner) {
            Err(SidecarError::DuplicateRunner(tag)) => assert_eq!(tag, "exec"),
            other => panic!("expected DuplicateRunner, got {other:?}"),
        }
    }

    #[test]
    fn unknown_driver_is_a_config_level_error() {
        let registry = RunnerRegistry::with_builtin().unwrap();
        let backend = Arc::new(ConfiguredBackend::new("nx", "nxlog", vec![], "rpc"));
        match registry.build(backend, Arc::new(Context::default())) {
            Err(SidecarError::UnknownRunner(tag)) => assert_eq!(tag, "rpc"),
            other => panic!("expected UnknownRunner, got {other:?}"),
        }
    }

    #[test]
    fn init_is_idempotent() {
        let a = init().unwrap() as *const RunnerRegistry;
        let b = init().unwrap() as *const RunnerRegistry;
        assert_eq!(a, b);
        assert!(global().unwrap().lookup("exec").is_ok());
    }
}
