use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use quartermaster::config::{RedirectPolicy, UnitConfig};
use quartermaster::error::Error;

#[test]
fn defaults_validate() {
    UnitConfig::default().validate().unwrap();
}

#[test]
fn ssl_cert_without_key_is_a_configuration_error() {
    let config = UnitConfig {
        ssl_cert: Some(BASE64_STANDARD.encode("cert")),
        ..UnitConfig::default()
    };

    let err = config.validate().unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }), "got {err}");
    assert!(err.to_string().contains("ssl_key"));
}

#[test]
fn ssl_key_without_cert_is_a_configuration_error() {
    let config = UnitConfig {
        ssl_key: Some(BASE64_STANDARD.encode("key")),
        ..UnitConfig::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn ssl_pair_must_be_base64() {
    let config = UnitConfig {
        ssl_cert: Some("not base64 !!!".to_string()),
        ssl_key: Some(BASE64_STANDARD.encode("key")),
        ..UnitConfig::default()
    };

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("base64"));
}

#[test]
fn valid_ssl_pair_decodes() {
    let config = UnitConfig {
        ssl_cert: Some(BASE64_STANDARD.encode("cert pem")),
        ssl_key: Some(BASE64_STANDARD.encode("key pem")),
        ..UnitConfig::default()
    };

    config.validate().unwrap();
    let (cert, key) = config.ssl_override().unwrap().unwrap();
    assert_eq!(cert, b"cert pem");
    assert_eq!(key, b"key pem");
}

#[test]
fn zero_workers_is_rejected() {
    let config = UnitConfig {
        worker_counts: 0,
        ..UnitConfig::default()
    };

    assert!(config.validate().is_err());
}

#[test]
fn invalid_root_url_is_rejected() {
    let config = UnitConfig {
        root_url: Some("not a url".to_string()),
        ..UnitConfig::default()
    };

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("root_url"));
}

#[test]
fn redirect_policy_defaults_to_default() {
    assert_eq!(RedirectPolicy::default(), RedirectPolicy::Default);
    assert_eq!(UnitConfig::default().redirect_https, RedirectPolicy::Default);
}
