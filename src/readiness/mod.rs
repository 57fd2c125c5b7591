pub mod tracker;

pub use tracker::{Dependency, ReadinessTracker, UnitStatus};
