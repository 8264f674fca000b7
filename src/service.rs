// src/service.rs

//! Handle for the OS service-management layer.
//!
//! The sidecar does not install itself as an OS service; it only carries the
//! identity of the service that drives it so runners and the daemon can find
//! each other.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq)]
struct ServiceInfo {
    name: String,
    display_name: String,
}

/// Cheap, clonable identity of the controlling service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle(Arc<ServiceInfo>);

impl ServiceHandle {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self(Arc::new(ServiceInfo {
            name: name.into(),
            display_name: display_name.into(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn display_name(&self) -> &str {
        &self.0.display_name
    }
}

impl Default for ServiceHandle {
    fn default() -> Self {
        Self::new("collector-sidecar", "Log collector sidecar")
    }
}

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}
