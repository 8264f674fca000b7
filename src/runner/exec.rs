// src/runner/exec.rs

//! Native-process runner.
//!
//! `start` spawns one supervision task per runner. That task launches the
//! backend executable, pipes its stdout/stderr into rotated log files, waits
//! for it to exit, and then asks [`SupervisionPolicy::assess`] whether to
//! relaunch after a backoff, give up, or end because `stop` was requested.
//!
//! `stop` clears the supervising flag first, then asks the supervision task to
//! send SIGHUP, waits the grace period, has it kill whatever is left, and
//! finally joins it. Clearing the flag before anything else is what keeps the
//! loop from relaunching a process that `stop` has just killed. Only the task
//! that owns the child ever signals it, so a reaped pid is never signalled.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::process::Command;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::backends::{Backend, StatusKind, set_status_log_error};
use crate::config::DaemonConfig;
use crate::context::Context;
use crate::errors::Result;
use crate::rotation::{RotatingLog, create_path_to_file, open_rotated_log, pump};
use crate::service::ServiceHandle;

use super::common::RunnerCommon;
use super::policy::NextStep;
use super::{Runner, RunnerFuture, restart_with_cooldown};

/// How long to wait for the output pumps after the child exited. A backend
/// that leaves grandchildren holding its pipes must not stall supervision.
const PUMP_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

/// Constructor registered under the `"exec"` class tag.
pub fn new_exec_runner(backend: Arc<dyn Backend>, context: Arc<Context>) -> Arc<dyn Runner> {
    Arc::new(ExecRunner::new(backend, context))
}

/// The process currently launched by the supervision task.
#[derive(Debug)]
struct LiveChild {
    pid: Option<u32>,
    hangup: Arc<Notify>,
    kill: Arc<Notify>,
}

/// State shared between the runner handle and its supervision task.
#[derive(Debug)]
struct ExecState {
    common: RunnerCommon,
    exec: String,
    args: Vec<String>,
    stderr: PathBuf,
    stdout: PathBuf,
    supervising: AtomicBool,
    restart_count: AtomicU32,
    started_at: Mutex<Option<Instant>>,
    child: Mutex<Option<LiveChild>>,
    /// Wakes a supervision task sleeping in its retry backoff.
    wake: Notify,
}

#[derive(Debug)]
pub struct ExecRunner {
    state: Arc<ExecState>,
    supervisor: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ExecRunner {
    pub fn new(backend: Arc<dyn Backend>, context: Arc<Context>) -> Self {
        let (stderr, stdout) = context.backend_log_paths(backend.name());
        let exec = backend.exec_path().to_string();
        let args = backend.exec_args().to_vec();

        Self {
            state: Arc::new(ExecState {
                common: RunnerCommon::new(backend, context),
                exec,
                args,
                stderr,
                stdout,
                supervising: AtomicBool::new(false),
                restart_count: AtomicU32::new(1),
                started_at: Mutex::new(None),
                child: Mutex::new(None),
                wake: Notify::new(),
            }),
            supervisor: tokio::sync::Mutex::new(None),
        }
    }

    /// Current value of the restart counter.
    pub fn restart_count(&self) -> u32 {
        self.state.restart_count.load(Ordering::SeqCst)
    }

    /// When the most recent launch happened.
    pub fn last_started(&self) -> Option<Instant> {
        *lock(&self.state.started_at)
    }

    /// PID of the live backend process, if one is running.
    pub fn pid(&self) -> Option<u32> {
        lock(&self.state.child).as_ref().and_then(|c| c.pid)
    }

    pub fn stderr_path(&self) -> &Path {
        &self.state.stderr
    }

    pub fn stdout_path(&self) -> &Path {
        &self.state.stdout
    }

    async fn start_inner(&self) -> Result<()> {
        if let Err(err) = self.validate_before_start() {
            error!(backend = %self.name(), error = %err, "not starting backend");
            return Err(err);
        }

        let mut supervisor = self.supervisor.lock().await;
        let active = supervisor.as_ref().is_some_and(|h| !h.is_finished());
        if active && self.state.supervising.load(Ordering::SeqCst) {
            debug!(backend = %self.name(), "supervision already active; ignoring start");
            return Ok(());
        }
        // A task that just gave up can still be finishing.
        if let Some(handle) = supervisor.take() {
            if let Err(e) = handle.await {
                warn!(backend = %self.name(), error = %e, "previous supervision task ended abnormally");
            }
        }

        self.state.restart_count.store(1, Ordering::SeqCst);
        self.state.supervising.store(true, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        *supervisor = Some(tokio::spawn(async move {
            state.supervise().await;
        }));

        Ok(())
    }

    async fn stop_inner(&self) -> Result<()> {
        let name = self.name();
        info!(backend = %name, "stopping");

        let mut supervisor = self.supervisor.lock().await;

        // Must happen before any signal so the loop cannot relaunch.
        self.state.supervising.store(false, Ordering::SeqCst);
        self.state.wake.notify_waiters();

        let hung_up = lock(&self.state.child)
            .as_ref()
            .map(|child| child.hangup.notify_one())
            .is_some();
        if hung_up {
            sleep(self.state.common.context.policy.shutdown_grace).await;
        }

        if let Some(child) = lock(&self.state.child).as_ref() {
            debug!(backend = %name, "backend still alive after grace period; killing");
            child.kill.notify_one();
        }

        if let Some(handle) = supervisor.take() {
            if let Err(e) = handle.await {
                error!(backend = %name, error = %e, "supervision task ended abnormally");
                self.state.supervising.store(false, Ordering::SeqCst);
            }
        }

        Ok(())
    }
}

impl Runner for ExecRunner {
    fn name(&self) -> &str {
        &self.state.common.name
    }

    fn running(&self) -> bool {
        self.state.supervising.load(Ordering::SeqCst)
    }

    fn validate_before_start(&self) -> Result<()> {
        match which::which(&self.state.exec) {
            Ok(_) => Ok(()),
            Err(e) => Err(set_status_log_error(
                self.state.common.backend.as_ref(),
                format!("Failed to find collector executable {:?}: {}", self.state.exec, e),
            )),
        }
    }

    fn start<'a>(&'a self, _service: &'a ServiceHandle) -> RunnerFuture<'a> {
        Box::pin(self.start_inner())
    }

    fn stop<'a>(&'a self, _service: &'a ServiceHandle) -> RunnerFuture<'a> {
        Box::pin(self.stop_inner())
    }

    fn restart<'a>(&'a self, service: &'a ServiceHandle) -> RunnerFuture<'a> {
        let cooldown = self.state.common.context.policy.restart_cooldown;
        Box::pin(restart_with_cooldown(self, service, cooldown))
    }

    fn set_daemon(&self, daemon: DaemonConfig) {
        self.state.common.set_daemon(daemon);
    }

    fn bind_to_service(&self, service: ServiceHandle) {
        self.state.common.bind_to_service(service);
    }

    fn service(&self) -> Option<ServiceHandle> {
        self.state.common.service()
    }
}

impl ExecState {
    fn backend(&self) -> &dyn Backend {
        self.common.backend.as_ref()
    }

    /// The supervision loop. Returns once the backend should stay down.
    async fn supervise(self: Arc<Self>) {
        let name = self.common.name.as_str();
        let policy = self.common.context.policy;

        loop {
            let started = Instant::now();
            *lock(&self.started_at) = Some(started);
            let launched = self.run_once().await;

            let supervising = self.supervising.load(Ordering::SeqCst);
            if !launched && !supervising {
                self.backend().set_status(StatusKind::Stopped, "Stopped");
                break;
            }

            let count = self.restart_count.load(Ordering::SeqCst);
            let assessment = policy.assess(started.elapsed(), count, supervising);
            self.restart_count.store(assessment.restart_count, Ordering::SeqCst);

            // An exit caused by stop is not a configuration problem.
            if assessment.exited_immediately && supervising {
                set_status_log_error(
                    self.backend(),
                    "Collector exits immediately, this should not happen! Please check your collector configuration!",
                );
            }

            match assessment.next {
                NextStep::Retry => {
                    error!(
                        backend = %name,
                        attempt = assessment.restart_count,
                        max = policy.max_restarts,
                        "backend crashed, trying to restart {}/{}",
                        assessment.restart_count,
                        policy.max_restarts
                    );
                    if !self.backoff().await {
                        break;
                    }
                    self.restart_count.fetch_add(1, Ordering::SeqCst);
                }
                NextStep::GiveUp => {
                    // Cleared before the report goes out.
                    self.supervising.store(false, Ordering::SeqCst);
                    set_status_log_error(
                        self.backend(),
                        format!("Collector failed to start after {} tries!", policy.max_restarts),
                    );
                    break;
                }
                NextStep::Stopped => {
                    self.backend().set_status(StatusKind::Stopped, "Stopped");
                    break;
                }
            }
        }

        self.supervising.store(false, Ordering::SeqCst);
        debug!(backend = %name, "supervision finished");
    }

    /// Sleep the retry backoff. Returns false if a stop arrived meanwhile.
    async fn backoff(&self) -> bool {
        let woken = self.wake.notified();
        tokio::pin!(woken);
        woken.as_mut().enable();

        if self.supervising.load(Ordering::SeqCst) {
            tokio::select! {
                _ = sleep(self.common.context.policy.retry_backoff) => {}
                _ = woken => {}
            }
        }

        let keep_going = self.supervising.load(Ordering::SeqCst);
        if !keep_going {
            self.backend().set_status(StatusKind::Stopped, "Stopped");
        }
        keep_going
    }

    /// Launch the backend once and wait for it to go away. Returns whether a
    /// process was actually spawned.
    async fn run_once(&self) -> bool {
        let name = self.common.name.as_str();
        let backend = self.backend();
        let daemon = self.common.daemon();

        if !self.supervising.load(Ordering::SeqCst) {
            return false;
        }

        info!(backend = %name, driver = %backend.driver(), "starting backend");

        let stderr_sink = self.open_sink(&self.stderr, "stderr");
        let stdout_sink = self.open_sink(&self.stdout, "stdout");

        let mut cmd = Command::new(&self.exec);
        cmd.args(&self.args)
            .envs(daemon.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(piped_or_null(&stdout_sink))
            .stderr(piped_or_null(&stderr_sink))
            .kill_on_drop(true);
        if let Some(ref dir) = daemon.dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                set_status_log_error(
                    backend,
                    format!("Failed to launch collector {:?}: {}", self.exec, e),
                );
                return false;
            }
        };

        let hangup = Arc::new(Notify::new());
        let kill = Arc::new(Notify::new());
        *lock(&self.child) = Some(LiveChild {
            pid: child.id(),
            hangup: Arc::clone(&hangup),
            kill: Arc::clone(&kill),
        });

        // A stop that raced the spawn saw no child to signal.
        if !self.supervising.load(Ordering::SeqCst) {
            kill.notify_one();
        }

        let mut pumps = Vec::new();
        if let (Some(out), Some(sink)) = (child.stdout.take(), stdout_sink) {
            pumps.push(tokio::spawn(pump(out, sink)));
        }
        if let (Some(err), Some(sink)) = (child.stderr.take(), stderr_sink) {
            pumps.push(tokio::spawn(pump(err, sink)));
        }

        backend.set_status(StatusKind::Running, "Running");

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                _ = hangup.notified() => {
                    // `id` is None once the child has been reaped.
                    if let Some(pid) = child.id() {
                        send_graceful_signal(name, pid);
                    }
                }
                _ = kill.notified() => {
                    if let Err(e) = child.start_kill() {
                        debug!(backend = %name, error = %e, "kill failed; process already gone");
                    }
                    break child.wait().await;
                }
            }
        };

        *lock(&self.child) = None;

        match status {
            Ok(status) => info!(
                backend = %name,
                exit_code = status.code().unwrap_or(-1),
                success = status.success(),
                "backend process exited"
            ),
            Err(e) => warn!(backend = %name, error = %e, "waiting for backend process failed"),
        }

        for handle in pumps {
            let abort = handle.abort_handle();
            match timeout(PUMP_DRAIN_TIMEOUT, handle).await {
                Ok(Ok(Ok(_))) => {}
                Ok(Ok(Err(e))) => warn!(backend = %name, error = %e, "copying backend output failed"),
                Ok(Err(e)) => warn!(backend = %name, error = %e, "output pump task failed"),
                Err(_) => {
                    debug!(backend = %name, "output pipe still held open; abandoning pump");
                    abort.abort();
                }
            }
        }

        true
    }

    /// Prepare a rotated log for one output stream. Failures are reported but
    /// do not stop the launch; the stream is discarded instead.
    fn open_sink(&self, path: &Path, stream: &str) -> Option<RotatingLog> {
        let ctx = &self.common.context;

        if let Err(e) = create_path_to_file(path) {
            set_status_log_error(
                self.backend(),
                format!("Failed to create path to collector's {} log {}: {}", stream, path.display(), e),
            );
            return None;
        }

        match open_rotated_log(path, ctx.log_rotation_time, ctx.log_max_age) {
            Ok(sink) => Some(sink),
            Err(e) => {
                set_status_log_error(
                    self.backend(),
                    format!("Failed to open collector's {} log {}: {}", stream, path.display(), e),
                );
                None
            }
        }
    }
}

fn piped_or_null(sink: &Option<RotatingLog>) -> Stdio {
    if sink.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(unix)]
fn send_graceful_signal(backend: &str, pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match i32::try_from(pid) {
        Ok(raw) => {
            if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGHUP) {
                debug!(backend, pid, error = %e, "SIGHUP not delivered");
            }
        }
        Err(_) => debug!(backend, pid, "pid out of range for signalling"),
    }
}

#[cfg(not(unix))]
fn send_graceful_signal(backend: &str, pid: u32) {
    debug!(backend, pid, "no graceful signal on this platform");
}
