use crate::cluster::peers::{LeadershipProbe, PeerStore};
use crate::domain::Gate;
use crate::error::Result;
use std::net::IpAddr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Leader => "leader",
            Role::Follower => "follower",
        }
    }
}

/// Result of settling leadership for one handler invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaderSettlement {
    pub role: Role,
    pub leader_ip: IpAddr,
    /// True when the observed leader address differs from the cached one,
    /// which obliges the caller to regenerate topology.
    pub changed: bool,
}

impl LeaderSettlement {
    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }
}

/// Publishes the leader's address on election and reads it back on
/// followers. The leader is the single authoritative writer of the shared
/// `leader-ip` value; stale entries are overwritten, never merged.
pub struct LeaderCoordinator;

impl LeaderCoordinator {
    pub fn settle(
        probe: &dyn LeadershipProbe,
        store: &mut dyn PeerStore,
        local_ip: IpAddr,
        cached_leader_ip: Option<IpAddr>,
    ) -> Result<Gate<LeaderSettlement>> {
        if probe.is_leader()? {
            let published = store.leader_ip()?;
            if published != Some(local_ip) {
                // Newest writer wins over whatever a previous leader left.
                store.publish_leader_ip(local_ip)?;
                tracing::info!(
                    target: "quartermaster::cluster",
                    event = "leader_ip_published",
                    leader_ip = %local_ip,
                    superseded = %published.map(|ip| ip.to_string()).unwrap_or_default(),
                );
            }
            return Ok(Gate::Ready(LeaderSettlement {
                role: Role::Leader,
                leader_ip: local_ip,
                changed: cached_leader_ip != Some(local_ip),
            }));
        }

        match store.leader_ip()? {
            Some(leader_ip) => Ok(Gate::Ready(LeaderSettlement {
                role: Role::Follower,
                leader_ip,
                changed: cached_leader_ip != Some(leader_ip),
            })),
            None => Ok(Gate::waiting("leader address not yet published")),
        }
    }
}
