#![forbid(unsafe_code)]

pub mod actions;
pub mod certs;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod driver;
pub mod error;
pub mod logging;
pub mod readiness;
pub mod relations;
pub mod telemetry;
pub mod topology;
