//! Top-level reconciliation driver: composes readiness tracking, peer
//! resolution, leadership settlement, certificate reconciliation, and
//! topology generation into one idempotent handler per event.

pub mod event;
pub mod state;

pub use event::Event;
pub use state::{StateStore, StoredState, STATE_VERSION};

use crate::certs::{self, CertificateIssuer, CertificateReconciler};
use crate::cluster::{LeaderCoordinator, LeadershipProbe, PeerSetResolver, PeerStore};
use crate::config::UnitConfig;
use crate::domain::{Gate, UnitName};
use crate::error::{Error, Result};
use crate::readiness::{Dependency, ReadinessTracker, UnitStatus};
use crate::relations;
use crate::topology::{
    self, LoadBalancerDocument, ServiceToggles, TopologyInputs, WorkerCounts,
};
use std::net::IpAddr;
use std::path::PathBuf;

/// Boundary to the external config-writer/service-restart collaborator.
/// A commit is all-or-nothing: on failure the previously committed
/// configuration stays in effect and the triggering event is safe to replay.
pub trait ConfigSink {
    fn commit(&mut self, document: &LoadBalancerDocument) -> Result<()>;
}

/// Boundary to the process supervisor used by the pause/resume actions.
pub trait ServiceSupervisor {
    fn pause(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
}

pub struct ReconciliationDriver<P, L, I, S, V>
where
    P: PeerStore,
    L: LeadershipProbe,
    I: CertificateIssuer,
    S: ConfigSink,
    V: ServiceSupervisor,
{
    pub(crate) unit: UnitName,
    pub(crate) local_ip: IpAddr,
    pub(crate) config: UnitConfig,
    pub(crate) peer_store: P,
    pub(crate) probe: L,
    pub(crate) issuer: I,
    pub(crate) sink: S,
    pub(crate) supervisor: V,
    pub(crate) state_store: StateStore,
    pub(crate) certs: CertificateReconciler,
}

impl<P, L, I, S, V> ReconciliationDriver<P, L, I, S, V>
where
    P: PeerStore,
    L: LeadershipProbe,
    I: CertificateIssuer,
    S: ConfigSink,
    V: ServiceSupervisor,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        unit: UnitName,
        local_ip: IpAddr,
        config: UnitConfig,
        state_path: PathBuf,
        cert_dir: PathBuf,
        peer_store: P,
        probe: L,
        issuer: I,
        sink: S,
        supervisor: V,
    ) -> Self {
        Self {
            unit,
            local_ip,
            config,
            peer_store,
            probe,
            issuer,
            sink,
            supervisor,
            state_store: StateStore::new(state_path),
            certs: CertificateReconciler::new(cert_dir),
        }
    }

    /// Run one event to completion.
    ///
    /// State is loaded once on entry and saved once on exit, including when
    /// the handler blocks; errors surface as a Blocked status with the
    /// human-readable reason preserved until a later event clears it.
    /// Replaying an event with unchanged inputs produces no externally
    /// visible change.
    pub fn handle(&mut self, event: Event) -> Result<UnitStatus> {
        let span = tracing::info_span!(
            target: "quartermaster::driver",
            "reconcile",
            event = event.kind(),
            unit = %self.unit,
        );
        let _guard = span.enter();

        let mut state = self.state_store.load()?;

        let status = match self.dispatch(&event, &mut state) {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(
                    target: "quartermaster::driver",
                    event = "reconcile_blocked",
                    kind = event.kind(),
                    reason = %err,
                );
                UnitStatus::Blocked(err.to_string())
            }
        };

        self.state_store.save(&mut state)?;

        tracing::info!(
            target: "quartermaster::driver",
            event = "reconcile_completed",
            kind = event.kind(),
            status = %status,
        );

        Ok(status)
    }

    fn dispatch(&mut self, event: &Event, state: &mut StoredState) -> Result<UnitStatus> {
        // Install an incoming config before the pre-flight validation; a fix
        // must not be rejected by the config it replaces.
        if let Event::ConfigChanged(new_config) = event {
            new_config.validate()?;
            self.config = new_config.clone();
            state.hostagent_messenger = new_config.enable_hostagent_messenger;
            state.ubuntu_installer_attach = new_config.enable_ubuntu_installer_attach;
        }
        self.config.validate()?;

        let mut tracker = ReadinessTracker::from_flags(&state.readiness);

        match event {
            Event::DatabaseChanged(payload) => {
                match relations::database_endpoint(payload, &self.unit, &self.config) {
                    Gate::Ready(endpoint) => {
                        state.database = Some(endpoint);
                        if tracker.mark(Dependency::Database, true) {
                            tracing::info!(
                                target: "quartermaster::driver",
                                event = "dependency_ready",
                                dependency = Dependency::Database.as_str(),
                            );
                        }
                    }
                    Gate::Waiting(reason) => {
                        tracker.mark(Dependency::Database, false);
                        tracing::debug!(
                            target: "quartermaster::driver",
                            event = "dependency_pending",
                            dependency = Dependency::Database.as_str(),
                            reason = %reason,
                        );
                    }
                }
            }
            Event::BrokerChanged(payload) => match relations::broker_endpoint(payload) {
                Gate::Ready(endpoint) => {
                    state.broker = Some(endpoint);
                    if tracker.mark(Dependency::MessageBroker, true) {
                        tracing::info!(
                            target: "quartermaster::driver",
                            event = "dependency_ready",
                            dependency = Dependency::MessageBroker.as_str(),
                        );
                    }
                }
                Gate::Waiting(reason) => {
                    tracker.mark(Dependency::MessageBroker, false);
                    tracing::debug!(
                        target: "quartermaster::driver",
                        event = "dependency_pending",
                        dependency = Dependency::MessageBroker.as_str(),
                        reason = %reason,
                    );
                }
            },
            Event::LoadBalancerJoined => {
                tracker.mark(Dependency::LoadBalancer, true);
            }
            Event::ConfigChanged(_)
            | Event::CertificatesAvailable
            | Event::PeerChanged
            | Event::LeadershipChanged
            | Event::Tick => {}
        }

        let result = self.converge(state, &mut tracker);
        state.readiness = tracker.flags().clone();
        result
    }

    /// The convergence pass shared by every event: resolve peers, settle
    /// leadership, reconcile certificates, and regenerate topology when any
    /// generation input changed. Handlers carry no ordering assumptions
    /// between each other; each invocation re-derives everything it needs.
    fn converge(
        &mut self,
        state: &mut StoredState,
        tracker: &mut ReadinessTracker,
    ) -> Result<UnitStatus> {
        let peers = PeerSetResolver::resolve(&mut self.peer_store, &self.unit, self.local_ip)?;

        let settlement = match LeaderCoordinator::settle(
            &self.probe,
            &mut self.peer_store,
            self.local_ip,
            state.leader_ip,
        )? {
            Gate::Ready(settlement) => settlement,
            Gate::Waiting(reason) => {
                tracing::debug!(
                    target: "quartermaster::driver",
                    event = "leadership_pending",
                    reason = %reason,
                );
                let mut pending: Vec<String> = tracker
                    .pending()
                    .iter()
                    .map(|dep| dep.as_str().to_string())
                    .collect();
                pending.push("leader-ip".to_string());
                return Ok(UnitStatus::Waiting(pending));
            }
        };
        state.leader_ip = Some(settlement.leader_ip);

        let attributes = certs::attributes_for(&self.config, self.local_ip)?;
        if state.certificate_identity.as_ref() != Some(&attributes) {
            // Identity changed; whatever is on disk belongs to the old one.
            state.cert_path = None;
        }
        let cert_path = match self
            .certs
            .reconcile(&self.config, &mut self.issuer, &attributes)?
        {
            Gate::Ready(path) => {
                state.cert_path = Some(path.clone());
                tracker.mark(Dependency::Certificates, true);
                Some(path)
            }
            Gate::Waiting(reason) => {
                tracker.mark(Dependency::Certificates, false);
                tracing::debug!(
                    target: "quartermaster::driver",
                    event = "dependency_pending",
                    dependency = Dependency::Certificates.as_str(),
                    reason = %reason,
                );
                None
            }
        };
        state.certificate_identity = Some(attributes);

        if tracker.is_ready(Dependency::LoadBalancer) {
            if let Some(cert_path) = cert_path {
                let counts = WorkerCounts::from_scale(self.config.worker_counts);
                let toggles = ServiceToggles {
                    hostagent_messenger: state.hostagent_messenger,
                    ubuntu_installer_attach: state.ubuntu_installer_attach,
                };
                let inputs = TopologyInputs {
                    peers: &peers,
                    counts: &counts,
                    redirect: self.config.redirect_https,
                    toggles,
                    cert_path: Some(cert_path.as_path()),
                    is_leader: settlement.is_leader(),
                };
                let document = topology::generate(&inputs)?;
                let fingerprint = document.fingerprint();

                if state.topology_fingerprint == Some(fingerprint) {
                    tracing::debug!(
                        target: "quartermaster::driver",
                        event = "topology_unchanged",
                        fingerprint = fingerprint,
                    );
                } else if state.paused {
                    tracing::info!(
                        target: "quartermaster::driver",
                        event = "topology_commit_skipped",
                        reason = "unit is paused",
                    );
                } else {
                    self.sink.commit(&document).map_err(|err| {
                        Error::collaborator("commit-load-balancer-config", err.to_string())
                    })?;
                    state.topology_fingerprint = Some(fingerprint);
                    tracing::info!(
                        target: "quartermaster::driver",
                        event = "topology_committed",
                        frontends = document.frontends.len(),
                        role = settlement.role.as_str(),
                        redirect = self.config.redirect_https.as_str(),
                        peers = peers.len(),
                    );
                }
            }
        }

        Ok(tracker.aggregate())
    }
}
