// tests/runner_registry.rs

mod common;
use crate::common::builders::{fast_policy, test_context};
use crate::common::init_tracing;
use crate::common::recording_backend::RecordingBackend;

use std::sync::Arc;

use sidecar::backends::Backend;
use sidecar::context::Context;
use sidecar::errors::SidecarError;
use sidecar::runner::exec::new_exec_runner;
use sidecar::runner::{Runner, RunnerRegistry};

/// Stand-in for a future runner kind (e.g. one driving an already running
/// daemon over RPC). It reuses the exec runner underneath.
fn rpc_runner(backend: Arc<dyn Backend>, context: Arc<Context>) -> Arc<dyn Runner> {
    new_exec_runner(backend, context)
}

#[test]
fn distinct_tags_register_and_resolve_independently() {
    init_tracing();

    let mut registry = RunnerRegistry::new();
    registry.register("exec", new_exec_runner).unwrap();
    registry.register("rpc", rpc_runner).unwrap();

    assert!(registry.lookup("exec").is_ok());
    assert!(registry.lookup("rpc").is_ok());
    assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["exec", "rpc"]);
}

#[test]
fn second_registration_of_a_tag_fails() {
    let mut registry = RunnerRegistry::new();
    registry.register("rpc", rpc_runner).unwrap();

    match registry.register("rpc", new_exec_runner) {
        Err(SidecarError::DuplicateRunner(tag)) => assert_eq!(tag, "rpc"),
        other => panic!("Expected DuplicateRunner, got: {:?}", other),
    }

    // The first registration is untouched.
    assert_eq!(registry.tags().count(), 1);
}

#[test]
fn build_picks_constructor_by_driver_tag() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = RunnerRegistry::with_builtin().unwrap();
    registry.register("rpc", rpc_runner).unwrap();

    let backend = Arc::new(RecordingBackend::new("winlog", "true", &[]).with_driver("rpc"));
    let runner = registry
        .build(backend, test_context(dir.path(), fast_policy()))
        .unwrap();

    assert_eq!(runner.name(), "winlog");
    assert!(!runner.running());
}

#[test]
fn unknown_tag_is_reported_not_ignored() {
    let registry = RunnerRegistry::with_builtin().unwrap();
    match registry.lookup("docker") {
        Err(SidecarError::UnknownRunner(tag)) => assert_eq!(tag, "docker"),
        other => panic!("Expected UnknownRunner, got: {:?}", other.map(|_| ())),
    }
}
