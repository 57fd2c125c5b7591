//! Parsing of relation-style key/value payloads from downstream
//! dependencies. Missing fields and pending authorization are waiting
//! conditions, never errors.

use crate::config::UnitConfig;
use crate::domain::{Gate, UnitName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Database endpoint as agreed with the database dependency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// Message broker endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerEndpoint {
    /// One hostname, or several joined with commas.
    pub hostname: String,
    pub password: String,
}

const DEFAULT_DB_PORT: u16 = 5432;

/// Parse the database relation payload.
///
/// Precondition: the local unit identity must appear in `allowed-units`;
/// until it does the relation is treated as pending, with no error raised.
/// Manual `db_*` configuration overrides take priority over relation values.
pub fn database_endpoint(
    payload: &BTreeMap<String, String>,
    local_unit: &UnitName,
    config: &UnitConfig,
) -> Gate<DatabaseEndpoint> {
    let Some(allowed) = payload.get("allowed-units") else {
        return Gate::waiting("database relation has not sent allowed-units");
    };
    if !allowed
        .split_whitespace()
        .any(|unit| unit == local_unit.as_str())
    {
        return Gate::waiting(format!(
            "unit {local_unit} is not yet in the database allowed-units list"
        ));
    }

    let Some(master) = payload.get("master") else {
        return Gate::waiting("database relation has not sent master connection data");
    };
    let master = parse_master(master);

    let host = config
        .db_host
        .clone()
        .or_else(|| master.get("host").cloned());
    let Some(host) = host else {
        return Gate::waiting("database master data has no host");
    };

    let password = config
        .db_landscape_password
        .clone()
        .or_else(|| master.get("password").cloned())
        .or_else(|| payload.get("password").cloned());
    let Some(password) = password else {
        return Gate::waiting("database master data has no password");
    };

    let port = match config.db_port {
        Some(port) => port,
        None => match master.get("port").or_else(|| payload.get("port")) {
            Some(raw) => match raw.parse() {
                Ok(port) => port,
                Err(_) => {
                    return Gate::waiting(format!(
                        "database relation sent an unusable port `{raw}`"
                    ));
                }
            },
            None => DEFAULT_DB_PORT,
        },
    };

    let user = config
        .db_schema_user
        .clone()
        .or_else(|| master.get("user").cloned())
        .or_else(|| payload.get("user").cloned())
        .unwrap_or_else(|| "postgres".to_string());

    Gate::Ready(DatabaseEndpoint {
        host,
        port,
        user,
        password,
    })
}

/// Parse the message-broker relation payload. `hostname` may arrive as a
/// single value or a bracketed list; lists are joined with commas.
pub fn broker_endpoint(payload: &BTreeMap<String, String>) -> Gate<BrokerEndpoint> {
    let Some(hostname) = payload.get("hostname") else {
        return Gate::waiting("message-broker relation has not sent hostname");
    };
    let Some(password) = payload.get("password") else {
        return Gate::waiting("message-broker relation has not sent password");
    };

    Gate::Ready(BrokerEndpoint {
        hostname: join_hostnames(hostname),
        password: password.clone(),
    })
}

/// `master` is a space-separated list of `key=value` tokens, e.g.
/// `host=10.1.2.3 dbname=unit port=5432 password=secret`.
fn parse_master(master: &str) -> BTreeMap<String, String> {
    master
        .split_whitespace()
        .filter_map(|token| {
            token
                .split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
        })
        .collect()
}

fn join_hostnames(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    inner
        .split(',')
        .map(|host| host.trim().trim_matches(|c| c == '\'' || c == '"'))
        .filter(|host| !host.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
