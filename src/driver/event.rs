use std::collections::BTreeMap;

/// Every inbound signal the driver reacts to. The mapping from variant to
/// handler is a total `match`, checked at compile time; there is no
/// string-keyed dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Database relation data changed (payload is the relation's key/value
    /// snapshot for this invocation only).
    DatabaseChanged(BTreeMap<String, String>),
    /// Message-broker relation data changed.
    BrokerChanged(BTreeMap<String, String>),
    /// The load-balancer relation joined and can consume topology documents.
    LoadBalancerJoined,
    /// The issuance collaborator signalled new certificate material.
    CertificatesAvailable,
    /// Peer membership changed.
    PeerChanged,
    /// The orchestrator's leadership primitive transitioned this unit.
    LeadershipChanged,
    /// The administrator changed configuration.
    ConfigChanged(crate::config::UnitConfig),
    /// Periodic convergence tick.
    Tick,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::DatabaseChanged(_) => "database-changed",
            Event::BrokerChanged(_) => "broker-changed",
            Event::LoadBalancerJoined => "load-balancer-joined",
            Event::CertificatesAvailable => "certificates-available",
            Event::PeerChanged => "peer-changed",
            Event::LeadershipChanged => "leadership-changed",
            Event::ConfigChanged(_) => "config-changed",
            Event::Tick => "tick",
        }
    }
}
