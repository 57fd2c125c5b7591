//! The load-balancer configuration document produced for the front-end
//! relation. Serialization order is fixed so identical inputs yield
//! byte-identical output.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// One server line: (name, address, port, options).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerEntry(pub String, pub String, pub u16, pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendEntry {
    pub backend_name: String,
    pub servers: Vec<ServerEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorFileEntry {
    pub http_status: u16,
    /// Base64-encoded page body.
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrontendEntry {
    pub service_name: String,
    pub service_host: String,
    pub service_port: u16,
    pub service_options: Vec<String>,
    pub servers: Vec<ServerEntry>,
    pub backends: Vec<BackendEntry>,
    pub error_files: Vec<ErrorFileEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadBalancerDocument {
    pub frontends: Vec<FrontendEntry>,
}

impl LoadBalancerDocument {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Stable 64-bit fingerprint used to detect no-op regenerations.
    /// DefaultHasher::new() uses fixed keys, so the value survives restarts.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn frontend(&self, service_name: &str) -> Option<&FrontendEntry> {
        self.frontends
            .iter()
            .find(|frontend| frontend.service_name == service_name)
    }
}

impl FrontendEntry {
    pub fn backend(&self, backend_name: &str) -> Option<&BackendEntry> {
        self.backends
            .iter()
            .find(|backend| backend.backend_name == backend_name)
    }
}
