use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

/// Which frontend paths get an HTTP to HTTPS redirect rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectPolicy {
    All,
    None,
    #[default]
    Default,
}

impl RedirectPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RedirectPolicy::All => "all",
            RedirectPolicy::None => "none",
            RedirectPolicy::Default => "default",
        }
    }
}

/// Administrator-facing configuration surface of one unit.
///
/// Manual `db_*` values take priority over relation-provided ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitConfig {
    #[serde(default = "default_worker_counts")]
    pub worker_counts: u32,
    #[serde(default)]
    pub ssl_cert: Option<String>,
    #[serde(default)]
    pub ssl_key: Option<String>,
    #[serde(default)]
    pub root_url: Option<String>,
    #[serde(default)]
    pub redirect_https: RedirectPolicy,
    #[serde(default)]
    pub enable_hostagent_messenger: bool,
    #[serde(default)]
    pub enable_ubuntu_installer_attach: bool,
    #[serde(default)]
    pub db_host: Option<String>,
    #[serde(default)]
    pub db_port: Option<u16>,
    #[serde(default)]
    pub db_schema_user: Option<String>,
    #[serde(default)]
    pub db_schema_password: Option<String>,
    #[serde(default)]
    pub db_landscape_password: Option<String>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            worker_counts: default_worker_counts(),
            ssl_cert: None,
            ssl_key: None,
            root_url: None,
            redirect_https: RedirectPolicy::Default,
            enable_hostagent_messenger: false,
            enable_ubuntu_installer_attach: false,
            db_host: None,
            db_port: None,
            db_schema_user: None,
            db_schema_password: None,
            db_landscape_password: None,
        }
    }
}

const fn default_worker_counts() -> u32 {
    2
}

impl UnitConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/unit").required(false))
            .add_source(Environment::with_prefix("QUARTERMASTER").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Semantic validation beyond deserialization. Any failure here is a
    /// blocking configuration error; topology generation must not run.
    pub fn validate(&self) -> Result<()> {
        if self.worker_counts == 0 {
            return Err(Error::configuration("worker_counts must be at least 1"));
        }

        match (&self.ssl_cert, &self.ssl_key) {
            (Some(_), None) => {
                return Err(Error::configuration(
                    "ssl_cert is set but ssl_key is missing; both must be provided together",
                ));
            }
            (None, Some(_)) => {
                return Err(Error::configuration(
                    "ssl_key is set but ssl_cert is missing; both must be provided together",
                ));
            }
            (Some(cert), Some(key)) => {
                BASE64_STANDARD.decode(cert).map_err(|err| {
                    Error::configuration(format!("ssl_cert is not valid base64: {err}"))
                })?;
                BASE64_STANDARD.decode(key).map_err(|err| {
                    Error::configuration(format!("ssl_key is not valid base64: {err}"))
                })?;
            }
            (None, None) => {}
        }

        if let Some(root_url) = &self.root_url {
            let parsed = Url::parse(root_url).map_err(|err| {
                Error::configuration(format!("root_url `{root_url}` is not a valid URL: {err}"))
            })?;
            if parsed.host().is_none() {
                return Err(Error::configuration(format!(
                    "root_url `{root_url}` has no host"
                )));
            }
        }

        Ok(())
    }

    /// Decoded `ssl_cert`/`ssl_key` override pair, when configured.
    pub fn ssl_override(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        match (&self.ssl_cert, &self.ssl_key) {
            (Some(cert), Some(key)) => {
                let cert = BASE64_STANDARD.decode(cert)?;
                let key = BASE64_STANDARD.decode(key)?;
                Ok(Some((cert, key)))
            }
            (None, None) => Ok(None),
            _ => Err(Error::configuration(
                "ssl_cert and ssl_key must be provided together",
            )),
        }
    }
}
