//! Pure derivation of the load-balancer topology from cluster membership,
//! worker counts, redirect policy, feature toggles, and TLS material.
//!
//! Generation is deterministic and side-effect-free: peers are iterated in
//! sorted order and every collection is built in a fixed sequence, so
//! identical inputs always serialize to byte-identical documents.

use crate::cluster::PeerSet;
use crate::config::RedirectPolicy;
use crate::topology::assets;
use crate::topology::document::{
    BackendEntry, ErrorFileEntry, FrontendEntry, LoadBalancerDocument, ServerEntry,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub const HTTP_PORT: u16 = 80;
pub const HTTPS_PORT: u16 = 443;

/// Health-check options attached to every generated server line.
const SERVER_OPTIONS: &str = "check inter 5000 rise 2 fall 5 maxconn 50";

/// Logical services the unit places behind the load balancer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Service {
    Appserver,
    Pingserver,
    MessageServer,
    Api,
    PackageUpload,
    HashidDatabases,
    HostagentMessenger,
    HostagentControl,
    UbuntuInstallerAttach,
}

impl Service {
    /// Services whose instance count follows the configured worker count.
    pub const SCALABLE: [Service; 3] = [
        Service::Appserver,
        Service::MessageServer,
        Service::Api,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Service::Appserver => "appserver",
            Service::Pingserver => "pingserver",
            Service::MessageServer => "message-server",
            Service::Api => "api",
            Service::PackageUpload => "package-upload",
            Service::HashidDatabases => "hashid-databases",
            Service::HostagentMessenger => "hostagent-messenger",
            Service::HostagentControl => "hostagent-messenger-control",
            Service::UbuntuInstallerAttach => "ubuntu-installer-attach",
        }
    }

    pub fn base_port(self) -> u16 {
        match self {
            Service::Appserver => 8080,
            Service::Pingserver => 8070,
            Service::MessageServer => 8090,
            Service::Api => 9080,
            Service::PackageUpload => 9100,
            Service::HashidDatabases => 8130,
            Service::HostagentMessenger => 50051,
            Service::HostagentControl => 50052,
            Service::UbuntuInstallerAttach => 9190,
        }
    }

    /// Backends whose servers are populated only on the current leader.
    pub fn is_leader_exclusive(self) -> bool {
        matches!(
            self,
            Service::PackageUpload
                | Service::HashidDatabases
                | Service::HostagentControl
                | Service::UbuntuInstallerAttach
        )
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional services an administrator can toggle at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionalService {
    HostagentMessenger,
    UbuntuInstallerAttach,
}

impl OptionalService {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionalService::HostagentMessenger => "hostagent-messenger",
            OptionalService::UbuntuInstallerAttach => "ubuntu-installer-attach",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hostagent-messenger" => Some(OptionalService::HostagentMessenger),
            "ubuntu-installer-attach" => Some(OptionalService::UbuntuInstallerAttach),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServiceToggles {
    pub hostagent_messenger: bool,
    pub ubuntu_installer_attach: bool,
}

/// Instance counts per service. Leader-exclusive services are always
/// treated as a single instance regardless of what was configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCounts {
    counts: BTreeMap<Service, u32>,
}

impl WorkerCounts {
    /// The configured worker count scales every service in
    /// [`Service::SCALABLE`]; everything else runs one instance.
    pub fn from_scale(workers: u32) -> Self {
        let mut counts = BTreeMap::new();
        for service in Service::SCALABLE {
            counts.insert(service, workers);
        }
        Self { counts }
    }

    pub fn get(&self, service: Service) -> u32 {
        if service.is_leader_exclusive() {
            return 1;
        }
        self.counts.get(&service).copied().unwrap_or(1)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("peer set is empty; at least the local unit must be present")]
    EmptyPeerSet,
    #[error("no certificate available for the HTTPS frontend")]
    MissingCertificate,
    #[error("error page asset `{name}` is not known")]
    MissingErrorPage { name: String },
    #[error("worker count for `{service}` must be at least 1 and fit the port range, got {count}")]
    InvalidWorkerCount { service: &'static str, count: u32 },
}

pub struct TopologyInputs<'a> {
    pub peers: &'a PeerSet,
    pub counts: &'a WorkerCounts,
    pub redirect: RedirectPolicy,
    pub toggles: ServiceToggles,
    pub cert_path: Option<&'a Path>,
    pub is_leader: bool,
}

/// Derive the full load-balancer document. Deterministic; no side effects.
pub fn generate(inputs: &TopologyInputs<'_>) -> Result<LoadBalancerDocument, TopologyError> {
    if inputs.peers.is_empty() {
        return Err(TopologyError::EmptyPeerSet);
    }
    for service in Service::SCALABLE {
        let count = inputs.counts.get(service);
        // Worker index offsets the base port, so the count must keep every
        // derived port within u16.
        let port_span = u32::from(u16::MAX - service.base_port()) + 1;
        if count == 0 || count > port_span {
            return Err(TopologyError::InvalidWorkerCount {
                service: service.as_str(),
                count,
            });
        }
    }

    let error_files = encoded_error_files()?;
    let http = http_frontend(inputs, error_files.clone());
    let https = https_frontend(inputs, error_files)?;

    Ok(LoadBalancerDocument {
        frontends: vec![http, https],
    })
}

fn encoded_error_files() -> Result<Vec<ErrorFileEntry>, TopologyError> {
    assets::FRONTEND_ERROR_PAGES
        .iter()
        .map(|(status, name)| {
            let body = assets::error_page(name).ok_or_else(|| TopologyError::MissingErrorPage {
                name: (*name).to_string(),
            })?;
            Ok(ErrorFileEntry {
                http_status: *status,
                content: BASE64_STANDARD.encode(body),
            })
        })
        .collect()
}

fn http_frontend(inputs: &TopologyInputs<'_>, error_files: Vec<ErrorFileEntry>) -> FrontendEntry {
    let mut options = vec!["mode http".to_string()];
    match inputs.redirect {
        RedirectPolicy::All => {
            options.push("redirect scheme https code 301 if !{ ssl_fc }".to_string());
        }
        RedirectPolicy::Default => {
            // Health checks and repository mirroring stay on plain HTTP.
            options.push(
                "redirect scheme https code 301 if !{ ssl_fc } !{ path_beg /ping } !{ path_beg /repository }"
                    .to_string(),
            );
        }
        RedirectPolicy::None => {}
    }

    FrontendEntry {
        service_name: "http".to_string(),
        service_host: "0.0.0.0".to_string(),
        service_port: HTTP_PORT,
        service_options: options,
        servers: scalable_servers(inputs.peers, Service::Pingserver, 1),
        backends: Vec::new(),
        error_files,
    }
}

fn https_frontend(
    inputs: &TopologyInputs<'_>,
    error_files: Vec<ErrorFileEntry>,
) -> Result<FrontendEntry, TopologyError> {
    // A plaintext-only HTTPS frontend must never be emitted silently.
    let cert_path = inputs.cert_path.ok_or(TopologyError::MissingCertificate)?;

    let mut options = vec![
        "mode http".to_string(),
        format!("ssl crt {}", cert_path.display()),
    ];

    let mut backends = Vec::new();
    let mut declare = |service: Service, servers: Vec<ServerEntry>| {
        options.push(format!(
            "acl {name} path_beg {path}",
            name = service.as_str(),
            path = service_path(service),
        ));
        options.push(format!(
            "use_backend {name} if {name}",
            name = service.as_str()
        ));
        backends.push(BackendEntry {
            backend_name: service.as_str().to_string(),
            servers,
        });
    };

    declare(
        Service::MessageServer,
        scalable_servers(
            inputs.peers,
            Service::MessageServer,
            inputs.counts.get(Service::MessageServer),
        ),
    );
    declare(
        Service::Api,
        scalable_servers(inputs.peers, Service::Api, inputs.counts.get(Service::Api)),
    );
    declare(
        Service::PackageUpload,
        leader_servers(inputs.peers, Service::PackageUpload, inputs.is_leader),
    );
    declare(
        Service::HashidDatabases,
        leader_servers(inputs.peers, Service::HashidDatabases, inputs.is_leader),
    );
    if inputs.toggles.hostagent_messenger {
        declare(
            Service::HostagentMessenger,
            scalable_servers(inputs.peers, Service::HostagentMessenger, 1),
        );
        declare(
            Service::HostagentControl,
            leader_servers(inputs.peers, Service::HostagentControl, inputs.is_leader),
        );
    }
    if inputs.toggles.ubuntu_installer_attach {
        declare(
            Service::UbuntuInstallerAttach,
            leader_servers(inputs.peers, Service::UbuntuInstallerAttach, inputs.is_leader),
        );
    }

    Ok(FrontendEntry {
        service_name: "https".to_string(),
        service_host: "0.0.0.0".to_string(),
        service_port: HTTPS_PORT,
        service_options: options,
        servers: scalable_servers(
            inputs.peers,
            Service::Appserver,
            inputs.counts.get(Service::Appserver),
        ),
        backends,
        error_files,
    })
}

fn service_path(service: Service) -> &'static str {
    match service {
        Service::Appserver => "/",
        Service::Pingserver => "/ping",
        Service::MessageServer => "/message-system",
        Service::Api => "/api",
        Service::PackageUpload => "/upload",
        Service::HashidDatabases => "/hash-id-databases",
        Service::HostagentMessenger => "/hostagent-messenger",
        Service::HostagentControl => "/hostagent-control",
        Service::UbuntuInstallerAttach => "/ubuntu-installer-attach",
    }
}

/// One server per worker per peer. Peers are pre-sorted by address; within
/// a peer, worker index orders the entries and offsets the port.
fn scalable_servers(peers: &PeerSet, service: Service, count: u32) -> Vec<ServerEntry> {
    let mut servers = Vec::with_capacity(peers.len() * count as usize);
    for peer in &peers.all {
        for index in 0..count {
            servers.push(ServerEntry(
                format!("{}-{}-{}", service.as_str(), peer.identity(), index),
                peer.ip.to_string(),
                service.base_port() + index as u16,
                SERVER_OPTIONS.to_string(),
            ));
        }
    }
    servers
}

/// Leader-exclusive backends are always declared so consumers never see
/// backends appear or vanish across elections; only the server membership
/// changes, and only the current leader populates it.
fn leader_servers(peers: &PeerSet, service: Service, is_leader: bool) -> Vec<ServerEntry> {
    if !is_leader {
        return Vec::new();
    }
    let local = &peers.local;
    vec![ServerEntry(
        format!("{}-{}-0", service.as_str(), local.identity()),
        local.ip.to_string(),
        service.base_port(),
        SERVER_OPTIONS.to_string(),
    )]
}
