use crate::domain::UnitName;
use crate::error::Result;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// One peer's address plus its unit identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerAddress {
    pub unit: UnitName,
    pub ip: IpAddr,
}

impl PeerAddress {
    pub fn new(unit: UnitName, ip: IpAddr) -> Self {
        Self { unit, ip }
    }

    /// Identity slug used in generated server names.
    pub fn identity(&self) -> String {
        self.unit.identity()
    }
}

/// Cluster membership as observed by the local unit.
///
/// `all` is sorted by address and always contains the local unit's own
/// entry. `leader_ip` is absent until leadership has been established at
/// least once; once present it names a member of `all` under a converged
/// view (stale reads may briefly violate that between elections).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerSet {
    pub local: PeerAddress,
    pub leader_ip: Option<IpAddr>,
    pub all: Vec<PeerAddress>,
}

impl PeerSet {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }
}

/// Peer-wide shared store. Eventually consistent; each key has exactly one
/// designated writer (the owning unit for its own entry, the leader for
/// `leader-ip`). Readers may observe stale or absent values between writes.
pub trait PeerStore {
    fn publish_unit(&mut self, unit: &UnitName, ip: IpAddr) -> Result<()>;
    fn unit_entries(&self) -> Result<BTreeMap<UnitName, IpAddr>>;
    fn leader_ip(&self) -> Result<Option<IpAddr>>;
    fn publish_leader_ip(&mut self, ip: IpAddr) -> Result<()>;
}

/// Narrow seam to the orchestrator's leadership primitive.
pub trait LeadershipProbe {
    fn is_leader(&self) -> Result<bool>;
}

/// Derives the local unit's view of cluster membership from the peer store.
pub struct PeerSetResolver;

impl PeerSetResolver {
    /// Publish the local entry, then assemble the peer set. The local unit
    /// always appears in `all` even when the store has not yet echoed its
    /// write back.
    pub fn resolve(
        store: &mut dyn PeerStore,
        local_unit: &UnitName,
        local_ip: IpAddr,
    ) -> Result<PeerSet> {
        store.publish_unit(local_unit, local_ip)?;

        let mut entries = store.unit_entries()?;
        entries.insert(local_unit.clone(), local_ip);

        let mut all: Vec<PeerAddress> = entries
            .into_iter()
            .map(|(unit, ip)| PeerAddress::new(unit, ip))
            .collect();
        all.sort_by(|lhs, rhs| lhs.ip.cmp(&rhs.ip).then_with(|| lhs.unit.cmp(&rhs.unit)));

        let leader_ip = store.leader_ip()?;

        Ok(PeerSet {
            local: PeerAddress::new(local_unit.clone(), local_ip),
            leader_ip,
            all,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_always_includes_the_local_unit() {
        struct ForgetfulStore;

        impl PeerStore for ForgetfulStore {
            fn publish_unit(&mut self, _unit: &UnitName, _ip: IpAddr) -> Result<()> {
                Ok(())
            }

            fn unit_entries(&self) -> Result<BTreeMap<UnitName, IpAddr>> {
                Ok(BTreeMap::new())
            }

            fn leader_ip(&self) -> Result<Option<IpAddr>> {
                Ok(None)
            }

            fn publish_leader_ip(&mut self, _ip: IpAddr) -> Result<()> {
                Ok(())
            }
        }

        let unit = UnitName::new("fleet-server/0");
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        let peers = PeerSetResolver::resolve(&mut ForgetfulStore, &unit, ip).unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers.all[0], PeerAddress::new(unit, ip));
    }
}
