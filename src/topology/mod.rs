pub mod assets;
pub mod document;
pub mod generator;

pub use document::{
    BackendEntry, ErrorFileEntry, FrontendEntry, LoadBalancerDocument, ServerEntry,
};
pub use generator::{
    generate, OptionalService, Service, ServiceToggles, TopologyError, TopologyInputs,
    WorkerCounts, HTTPS_PORT, HTTP_PORT,
};
