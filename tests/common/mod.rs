#![allow(dead_code, unused_imports)]

pub use sidecar_test_utils::{builders, init_tracing, recording_backend, wait_until, with_timeout};
