use std::sync::Mutex;

use sidecar::backends::{Backend, BackendStatus, StatusKind};

/// A backend that keeps every status it was ever given, in order.
#[derive(Debug)]
pub struct RecordingBackend {
    name: String,
    exec_path: String,
    args: Vec<String>,
    driver: String,
    history: Mutex<Vec<BackendStatus>>,
}

impl RecordingBackend {
    pub fn new(name: &str, exec_path: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            exec_path: exec_path.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            driver: "exec".to_string(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Backend running `sh -c <script>`.
    pub fn shell(name: &str, script: &str) -> Self {
        Self::new(name, "sh", &["-c", script])
    }

    pub fn with_driver(mut self, driver: &str) -> Self {
        self.driver = driver.to_string();
        self
    }

    pub fn history(&self) -> Vec<BackendStatus> {
        self.history.lock().unwrap().clone()
    }

    /// Messages of every `Failed` status, in order.
    pub fn errors(&self) -> Vec<String> {
        self.history()
            .into_iter()
            .filter(|s| s.kind == StatusKind::Failed)
            .map(|s| s.message)
            .collect()
    }

    pub fn count(&self, kind: StatusKind) -> usize {
        self.history().iter().filter(|s| s.kind == kind).count()
    }

    pub fn has_error_containing(&self, needle: &str) -> bool {
        self.errors().iter().any(|m| m.contains(needle))
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn exec_path(&self) -> &str {
        &self.exec_path
    }

    fn exec_args(&self) -> &[String] {
        &self.args
    }

    fn driver(&self) -> &str {
        &self.driver
    }

    fn set_status(&self, kind: StatusKind, message: &str) {
        self.history.lock().unwrap().push(BackendStatus {
            kind,
            message: message.to_string(),
        });
    }

    fn status(&self) -> BackendStatus {
        self.history.lock().unwrap().last().cloned().unwrap_or_default()
    }
}
