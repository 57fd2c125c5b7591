//! The unit's persisted reconciliation state.
//!
//! One explicit, versioned struct owned by the driver: loaded once at the
//! start of each handler invocation, mutated in memory, saved once at the
//! end. There is no partial persistence.

use crate::certs::CertificateRequestAttributes;
use crate::error::{Context as _, Result};
use crate::readiness::Dependency;
use crate::relations::{BrokerEndpoint, DatabaseEndpoint};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

pub const STATE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    pub version: u32,
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub readiness: BTreeMap<Dependency, bool>,
    #[serde(default)]
    pub leader_ip: Option<IpAddr>,
    #[serde(default)]
    pub hostagent_messenger: bool,
    #[serde(default)]
    pub ubuntu_installer_attach: bool,
    #[serde(default)]
    pub topology_fingerprint: Option<u64>,
    #[serde(default)]
    pub certificate_identity: Option<CertificateRequestAttributes>,
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub database: Option<DatabaseEndpoint>,
    #[serde(default)]
    pub broker: Option<BrokerEndpoint>,
}

impl Default for StoredState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            saved_at: None,
            readiness: BTreeMap::new(),
            leader_ip: None,
            hostagent_messenger: false,
            ubuntu_installer_attach: false,
            topology_fingerprint: None,
            certificate_identity: None,
            cert_path: None,
            paused: false,
            database: None,
            broker: None,
        }
    }
}

/// Load/save points for [`StoredState`]. Saves are atomic (temp file plus
/// rename) so a handler that fails mid-flight never leaves a torn blob.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<StoredState> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let state: StoredState = serde_json::from_slice(&bytes)
                    .with_context(|| format!("parsing state blob {}", self.path.display()))?;
                crate::ensure_err!(
                    state.version <= STATE_VERSION,
                    "state blob {} has version {}, newer than the supported {}",
                    self.path.display(),
                    state.version,
                    STATE_VERSION,
                );
                Ok(state)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoredState::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, state: &mut StoredState) -> Result<()> {
        state.version = STATE_VERSION;
        state.saved_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let staging = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(state)?;
        fs::write(&staging, bytes)
            .with_context(|| format!("writing {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        Ok(())
    }
}
