use quartermaster::certs::{
    attributes_for, retrieve_material, CertificateMaterial, CertificateReconciler,
};
use quartermaster::config::UnitConfig;
use quartermaster::domain::Gate;
use quartermaster::error::Error;
use std::net::IpAddr;

#[path = "support/mod.rs"]
mod support;

const LOCAL: &str = "10.0.0.1";

fn local_ip() -> IpAddr {
    LOCAL.parse().unwrap()
}

#[test]
fn common_name_prefers_root_url_hostname() {
    let config = UnitConfig {
        root_url: Some("https://fleet.example.com/".to_string()),
        ..UnitConfig::default()
    };

    let attributes = attributes_for(&config, local_ip()).unwrap();
    assert_eq!(attributes.common_name, "fleet.example.com");
    assert_eq!(attributes.sans_ip, vec![local_ip()]);
    assert_eq!(attributes.sans_dns, vec!["fleet.example.com".to_string()]);
}

#[test]
fn common_name_falls_back_to_local_address() {
    let config = UnitConfig::default();

    let attributes = attributes_for(&config, local_ip()).unwrap();
    assert_eq!(attributes.common_name, LOCAL);
    assert_eq!(attributes.sans_ip, vec![local_ip()]);
    assert!(attributes.sans_dns.is_empty());
}

#[test]
fn ipv6_root_url_host_is_unbracketed() {
    let config = UnitConfig {
        root_url: Some("https://[2001:db8::1]/".to_string()),
        ..UnitConfig::default()
    };

    let attributes = attributes_for(&config, local_ip()).unwrap();
    assert_eq!(attributes.common_name, "2001:db8::1");
    assert_eq!(attributes.sans_dns, vec!["2001:db8::1".to_string()]);
}

#[test]
fn transport_encoding_round_trips() {
    let material = CertificateMaterial {
        certificate: "cert body".to_string(),
        private_key: "key body".to_string(),
        ca: "ca body".to_string(),
        chain: Some("chain body".to_string()),
    };

    let decoded = CertificateMaterial::decode(&material.encode()).unwrap();
    assert_eq!(decoded, material);

    let without_chain = CertificateMaterial {
        chain: None,
        ..material
    };
    let decoded = CertificateMaterial::decode(&without_chain.encode()).unwrap();
    assert_eq!(decoded, without_chain);
}

#[test]
fn reconcile_waits_and_requests_until_granted() {
    let workdir = tempfile::tempdir().unwrap();
    let reconciler = CertificateReconciler::new(workdir.path().join("certs"));
    let config = UnitConfig::default();
    let attributes = attributes_for(&config, local_ip()).unwrap();

    let issuer = support::SharedIssuer::default();
    let mut issuer_handle = issuer.clone();

    let outcome = reconciler
        .reconcile(&config, &mut issuer_handle, &attributes)
        .unwrap();
    assert!(matches!(outcome, Gate::Waiting(_)));
    assert_eq!(issuer.0.borrow().requests.len(), 1);

    issuer.grant(support::material());
    let outcome = reconciler
        .reconcile(&config, &mut issuer_handle, &attributes)
        .unwrap();
    let path = outcome.ready().expect("granted material persists");

    let pem = std::fs::read_to_string(&path).unwrap();
    assert_eq!(pem, support::material().combined_pem());
}

#[test]
fn persisted_material_is_superseded_not_merged() {
    let workdir = tempfile::tempdir().unwrap();
    let reconciler = CertificateReconciler::new(workdir.path().join("certs"));
    let config = UnitConfig::default();
    let attributes = attributes_for(&config, local_ip()).unwrap();

    let issuer = support::SharedIssuer::granting(support::material());
    let mut issuer_handle = issuer.clone();
    let first = reconciler
        .reconcile(&config, &mut issuer_handle, &attributes)
        .unwrap()
        .ready()
        .unwrap();

    let replacement = CertificateMaterial {
        certificate: "-----BEGIN CERTIFICATE-----\nnew\n-----END CERTIFICATE-----\n".to_string(),
        ..support::material()
    };
    issuer.grant(replacement.clone());
    let second = reconciler
        .reconcile(&config, &mut issuer_handle, &attributes)
        .unwrap()
        .ready()
        .unwrap();

    assert_eq!(first, second, "same identity, same path");
    let pem = std::fs::read_to_string(&second).unwrap();
    assert_eq!(pem, replacement.combined_pem());
}

#[test]
fn retrieval_action_fails_loudly_when_nothing_granted() {
    let config = UnitConfig::default();
    let attributes = attributes_for(&config, local_ip()).unwrap();
    let issuer = support::SharedIssuer::default();

    let err = retrieve_material(&issuer, &attributes).unwrap_err();
    assert!(matches!(err, Error::Action { .. }), "got {err}");

    issuer.grant(support::material());
    let material = retrieve_material(&issuer, &attributes).unwrap();
    assert_eq!(material, support::material());
}
