// src/runner/mod.rs

//! Backend runners.
//!
//! A [`Runner`] owns the lifecycle of one backend: validating it, launching
//! and supervising it, and shutting it down. Callers (the [`crate::daemon`])
//! only ever see `Arc<dyn Runner>`, so new runner kinds plug in through the
//! [`registry`] without touching them.
//!
//! - [`common`] holds the state every runner kind carries.
//! - [`exec`] is the native-process runner with its restart state machine.
//! - [`policy`] is the pure restart/backoff decision logic.
//! - [`registry`] maps backend class tags to runner constructors.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::warn;

use crate::config::DaemonConfig;
use crate::errors::Result;
use crate::service::ServiceHandle;

pub mod common;
pub mod exec;
pub mod policy;
pub mod registry;

pub use common::RunnerCommon;
pub use exec::ExecRunner;
pub use policy::{NextStep, RunAssessment, SupervisionPolicy};
pub use registry::{RunnerConstructor, RunnerRegistry};

/// Boxed future returned by the async runner operations.
pub type RunnerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Lifecycle contract shared by every runner kind.
pub trait Runner: Send + Sync + fmt::Debug {
    /// Stable identifier used in logs and status reports.
    fn name(&self) -> &str;

    /// Whether the runner currently intends its backend to be alive.
    fn running(&self) -> bool;

    /// Check launch preconditions. On failure the backend status is set to
    /// failed and nothing is launched.
    fn validate_before_start(&self) -> Result<()>;

    /// Begin supervision. Resolves once supervision is under way, not when
    /// the backend exits.
    fn start<'a>(&'a self, service: &'a ServiceHandle) -> RunnerFuture<'a>;

    /// Ask the backend to terminate. Resolves only after supervision has
    /// fully ceased.
    fn stop<'a>(&'a self, service: &'a ServiceHandle) -> RunnerFuture<'a>;

    /// Stop, cool down, start.
    fn restart<'a>(&'a self, service: &'a ServiceHandle) -> RunnerFuture<'a>;

    /// Replace the daemon settings used for the next launch.
    fn set_daemon(&self, daemon: DaemonConfig);

    fn bind_to_service(&self, service: ServiceHandle);
    fn service(&self) -> Option<ServiceHandle>;
}

/// Shared `restart` body: a failed stop is logged and the start still runs.
pub async fn restart_with_cooldown<R>(
    runner: &R,
    service: &ServiceHandle,
    cooldown: Duration,
) -> Result<()>
where
    R: Runner + ?Sized,
{
    if let Err(e) = runner.stop(service).await {
        warn!(runner = %runner.name(), error = %e, "stop failed during restart; starting anyway");
    }
    tokio::time::sleep(cooldown).await;
    runner.start(service).await
}
