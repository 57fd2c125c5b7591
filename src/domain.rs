//! Shared leaf types used across the reconciliation core.

use std::fmt;

/// Outcome of a step that may legitimately have nothing to act on yet.
///
/// A waiting condition is not an error: the owning readiness flag stays
/// false and the step is retried on the next event. Errors are reserved for
/// conditions that require operator attention.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Gate<T> {
    Ready(T),
    Waiting(String),
}

impl<T> Gate<T> {
    pub fn waiting<M>(reason: M) -> Self
    where
        M: Into<String>,
    {
        Gate::Waiting(reason.into())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Gate::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Gate::Ready(value) => Some(value),
            Gate::Waiting(_) => None,
        }
    }
}

/// Orchestrator-assigned unit name, e.g. `fleet-server/2`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitName(String);

impl UnitName {
    pub fn new<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identity slug usable inside generated server names.
    pub fn identity(&self) -> String {
        self.0.replace('/', "-")
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
