use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The fixed set of external dependencies a unit converges on.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Dependency {
    Database,
    MessageBroker,
    LoadBalancer,
    Certificates,
}

impl Dependency {
    pub const ALL: [Dependency; 4] = [
        Dependency::Database,
        Dependency::MessageBroker,
        Dependency::LoadBalancer,
        Dependency::Certificates,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dependency::Database => "database",
            Dependency::MessageBroker => "message-broker",
            Dependency::LoadBalancer => "load-balancer",
            Dependency::Certificates => "load-balancer-certificates",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate status surfaced to the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitStatus {
    Active,
    Waiting(Vec<String>),
    Blocked(String),
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Active => f.write_str("active"),
            UnitStatus::Waiting(pending) => {
                write!(f, "waiting on: {}", pending.join(", "))
            }
            UnitStatus::Blocked(reason) => write!(f, "blocked: {reason}"),
        }
    }
}

/// Per-dependency readiness flags and the aggregate they derive.
///
/// Flags are created false at unit start, flipped by the handler owning the
/// dependency, and never removed. `mark` is idempotent; a transition of the
/// aggregate triggers a status-surface update only, never topology
/// regeneration (that is the caller's call).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadinessTracker {
    flags: BTreeMap<Dependency, bool>,
}

impl Default for ReadinessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessTracker {
    pub fn new() -> Self {
        let flags = Dependency::ALL.iter().map(|dep| (*dep, false)).collect();
        Self { flags }
    }

    /// Rehydrate from persisted flags; dependencies absent from the blob
    /// start false, unknown entries are ignored.
    pub fn from_flags(stored: &BTreeMap<Dependency, bool>) -> Self {
        let mut tracker = Self::new();
        for (dep, ready) in stored {
            tracker.flags.insert(*dep, *ready);
        }
        tracker
    }

    pub fn flags(&self) -> &BTreeMap<Dependency, bool> {
        &self.flags
    }

    /// Set one flag. Returns whether the flag actually changed.
    pub fn mark(&mut self, dependency: Dependency, ready: bool) -> bool {
        let slot = self.flags.entry(dependency).or_insert(false);
        if *slot == ready {
            return false;
        }
        *slot = ready;
        true
    }

    pub fn is_ready(&self, dependency: Dependency) -> bool {
        self.flags.get(&dependency).copied().unwrap_or(false)
    }

    /// Dependencies still waiting, in stable order.
    pub fn pending(&self) -> Vec<Dependency> {
        self.flags
            .iter()
            .filter(|(_, ready)| !**ready)
            .map(|(dep, _)| *dep)
            .collect()
    }

    /// Active iff every tracked flag is true, otherwise Waiting with the
    /// pending dependency names.
    pub fn aggregate(&self) -> UnitStatus {
        let pending = self.pending();
        if pending.is_empty() {
            UnitStatus::Active
        } else {
            UnitStatus::Waiting(pending.iter().map(|dep| dep.as_str().to_string()).collect())
        }
    }
}
