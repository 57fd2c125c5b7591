//! Certificate identity derivation, transport encoding, and reconciliation
//! against an external issuance collaborator.

use crate::config::UnitConfig;
use crate::domain::Gate;
use crate::error::{Context as _, Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;
use url::{Host, Url};

/// Identity of a certificate request. Two requests with equal attributes
/// refer to the same certificate; a newly issued one supersedes, never
/// merges with, the previous material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequestAttributes {
    pub common_name: String,
    pub sans_ip: Vec<IpAddr>,
    pub sans_dns: Vec<String>,
}

/// Derive the request identity from configuration.
///
/// Common name is the hostname of the configured `root_url` when present,
/// else the local unit's address. SAN-IP always includes the local address;
/// SAN-DNS carries the hostname only when present and non-empty. IPv6 hosts
/// lose their URL brackets.
pub fn attributes_for(
    config: &UnitConfig,
    local_ip: IpAddr,
) -> Result<CertificateRequestAttributes> {
    let hostname = match &config.root_url {
        Some(root_url) => {
            let parsed = Url::parse(root_url).map_err(|err| {
                Error::configuration(format!("root_url `{root_url}` is not a valid URL: {err}"))
            })?;
            match parsed.host() {
                Some(Host::Domain(domain)) => Some(domain.to_string()),
                Some(Host::Ipv4(addr)) => Some(addr.to_string()),
                Some(Host::Ipv6(addr)) => Some(addr.to_string()),
                None => None,
            }
        }
        None => None,
    };

    let hostname = hostname.filter(|name| !name.is_empty());

    Ok(CertificateRequestAttributes {
        common_name: hostname
            .clone()
            .unwrap_or_else(|| local_ip.to_string()),
        sans_ip: vec![local_ip],
        sans_dns: hostname.into_iter().collect(),
    })
}

/// Issued TLS material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateMaterial {
    pub certificate: String,
    pub private_key: String,
    pub ca: String,
    pub chain: Option<String>,
}

impl CertificateMaterial {
    /// Transport encoding for relation payloads: each field base64'd.
    pub fn encode(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert(
            "certificate".to_string(),
            BASE64_STANDARD.encode(&self.certificate),
        );
        fields.insert(
            "private-key".to_string(),
            BASE64_STANDARD.encode(&self.private_key),
        );
        fields.insert("ca".to_string(), BASE64_STANDARD.encode(&self.ca));
        if let Some(chain) = &self.chain {
            fields.insert("chain".to_string(), BASE64_STANDARD.encode(chain));
        }
        fields
    }

    pub fn decode(fields: &BTreeMap<String, String>) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            let raw = fields
                .get(name)
                .ok_or_else(|| crate::err!("certificate payload is missing `{name}`"))?;
            let bytes = BASE64_STANDARD.decode(raw)?;
            String::from_utf8(bytes)
                .map_err(|err| crate::err!("certificate field `{name}` is not UTF-8: {err}"))
        };

        let chain = match fields.get("chain") {
            Some(_) => Some(field("chain")?),
            None => None,
        };

        Ok(Self {
            certificate: field("certificate")?,
            private_key: field("private-key")?,
            ca: field("ca")?,
            chain,
        })
    }

    /// Combined PEM in the order the load balancer expects: certificate,
    /// key, then the chain when present.
    pub fn combined_pem(&self) -> String {
        let mut pem = String::new();
        pem.push_str(&self.certificate);
        if !pem.ends_with('\n') {
            pem.push('\n');
        }
        pem.push_str(&self.private_key);
        if !pem.ends_with('\n') {
            pem.push('\n');
        }
        if let Some(chain) = &self.chain {
            pem.push_str(chain);
            if !pem.ends_with('\n') {
                pem.push('\n');
            }
        }
        pem
    }
}

/// External issuance collaborator.
pub trait CertificateIssuer {
    /// Submit (or refresh) a request for the given identity.
    fn request(&mut self, attributes: &CertificateRequestAttributes) -> Result<()>;

    /// Material already granted for the identity, if any.
    fn granted(
        &self,
        attributes: &CertificateRequestAttributes,
    ) -> Result<Option<CertificateMaterial>>;
}

/// Requests, persists, and supersedes the unit's TLS material.
pub struct CertificateReconciler {
    cert_dir: PathBuf,
}

impl CertificateReconciler {
    pub const CERT_FILE: &'static str = "quartermaster.pem";

    pub fn new(cert_dir: impl Into<PathBuf>) -> Self {
        Self {
            cert_dir: cert_dir.into(),
        }
    }

    pub fn cert_path(&self) -> PathBuf {
        self.cert_dir.join(Self::CERT_FILE)
    }

    /// Converge the on-disk material toward the requested identity.
    ///
    /// Returns Waiting while nothing has been granted yet; the
    /// `load-balancer-certificates` readiness flag stays false and the HTTPS
    /// frontend is not generated. An administrator-supplied override pair in
    /// the configuration takes priority over issued material.
    pub fn reconcile(
        &self,
        config: &UnitConfig,
        issuer: &mut dyn CertificateIssuer,
        attributes: &CertificateRequestAttributes,
    ) -> Result<Gate<PathBuf>> {
        if let Some((cert, key)) = config.ssl_override()? {
            let material = CertificateMaterial {
                certificate: String::from_utf8(cert)
                    .map_err(|err| Error::configuration(format!("ssl_cert is not PEM text: {err}")))?,
                private_key: String::from_utf8(key)
                    .map_err(|err| Error::configuration(format!("ssl_key is not PEM text: {err}")))?,
                ca: String::new(),
                chain: None,
            };
            let path = self.persist(&material)?;
            return Ok(Gate::Ready(path));
        }

        match issuer.granted(attributes)? {
            Some(material) => {
                let path = self.persist(&material)?;
                tracing::info!(
                    target: "quartermaster::certs",
                    event = "certificate_persisted",
                    common_name = %attributes.common_name,
                    path = %path.display(),
                );
                Ok(Gate::Ready(path))
            }
            None => {
                issuer.request(attributes)?;
                Ok(Gate::waiting("certificate not yet issued"))
            }
        }
    }

    /// Write the combined PEM atomically: temp file in the same directory,
    /// then rename over the target. A failed write leaves prior material
    /// untouched.
    fn persist(&self, material: &CertificateMaterial) -> Result<PathBuf> {
        fs::create_dir_all(&self.cert_dir)
            .with_context(|| format!("creating {}", self.cert_dir.display()))?;

        let target = self.cert_path();
        let staging = self.cert_dir.join(format!(".{}.tmp", Self::CERT_FILE));
        fs::write(&staging, material.combined_pem())
            .with_context(|| format!("writing {}", staging.display()))?;
        fs::rename(&staging, &target)
            .with_context(|| format!("renaming into {}", target.display()))?;
        Ok(target)
    }
}

/// Fetch granted material on demand; unlike reconciliation, absence here is
/// a hard failure reported to the caller.
pub fn retrieve_material(
    issuer: &dyn CertificateIssuer,
    attributes: &CertificateRequestAttributes,
) -> Result<CertificateMaterial> {
    issuer.granted(attributes)?.ok_or_else(|| {
        Error::action(
            "get-certificates",
            format!(
                "no certificate issued for common name `{}`",
                attributes.common_name
            ),
        )
    })
}
