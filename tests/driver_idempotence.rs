use quartermaster::config::UnitConfig;
use quartermaster::driver::Event;
use quartermaster::readiness::UnitStatus;

#[path = "support/mod.rs"]
mod support;

fn converging_events() -> Vec<Event> {
    vec![
        Event::LoadBalancerJoined,
        Event::DatabaseChanged(support::database_payload("fleet-server/0")),
        Event::BrokerChanged(support::broker_payload()),
        Event::CertificatesAvailable,
    ]
}

fn run(events: &[Event]) -> (tempfile::TempDir, support::Harness, UnitStatus) {
    let workdir = tempfile::tempdir().unwrap();
    let mut h = support::harness(
        workdir.path(),
        "fleet-server/0",
        "10.0.0.1",
        UnitConfig::default(),
        support::SharedProbe::leader(),
    );
    h.issuer.grant(support::material());

    let mut status = UnitStatus::Waiting(Vec::new());
    for event in events {
        status = h.driver.handle(event.clone()).unwrap();
    }
    (workdir, h, status)
}

#[test]
fn replaying_the_full_event_history_commits_nothing_new() {
    let workdir = tempfile::tempdir().unwrap();
    let mut h = support::harness(
        workdir.path(),
        "fleet-server/0",
        "10.0.0.1",
        UnitConfig::default(),
        support::SharedProbe::leader(),
    );
    h.issuer.grant(support::material());

    for event in converging_events() {
        h.driver.handle(event).unwrap();
    }
    let commits = h.sink.commits();
    assert_eq!(commits, 1);
    let baseline = h.sink.last().unwrap().to_json().unwrap();

    for event in converging_events() {
        let status = h.driver.handle(event).unwrap();
        assert_eq!(status, UnitStatus::Active);
    }
    assert_eq!(h.sink.commits(), commits, "replay is externally invisible");
    assert_eq!(h.sink.last().unwrap().to_json().unwrap(), baseline);
}

#[test]
fn event_order_does_not_change_the_outcome() {
    let forward = converging_events();
    let mut reversed = converging_events();
    reversed.reverse();
    let shuffled = vec![
        Event::CertificatesAvailable,
        Event::BrokerChanged(support::broker_payload()),
        Event::LoadBalancerJoined,
        Event::Tick,
        Event::DatabaseChanged(support::database_payload("fleet-server/0")),
    ];

    let (_dir, reference, reference_status) = run(&forward);
    let reference_doc = reference.sink.last().unwrap().to_json().unwrap();
    assert_eq!(reference_status, UnitStatus::Active);

    for events in [reversed, shuffled] {
        let (_dir, h, status) = run(&events);
        assert_eq!(status, reference_status);
        assert_eq!(h.sink.last().unwrap().to_json().unwrap(), reference_doc);
        assert_eq!(h.sink.commits(), 1, "one commit regardless of ordering");
    }
}

#[test]
fn restart_resumes_from_persisted_state_without_recommit() {
    let workdir = tempfile::tempdir().unwrap();
    let store = support::SharedPeerStore::default();

    let mut h = support::harness_with_store(
        workdir.path(),
        "fleet-server/0",
        "10.0.0.1",
        UnitConfig::default(),
        support::SharedProbe::leader(),
        store.clone(),
    );
    h.issuer.grant(support::material());
    for event in converging_events() {
        h.driver.handle(event).unwrap();
    }
    assert_eq!(h.sink.commits(), 1);
    drop(h);

    // A fresh driver on the same state and certificate directories models a
    // process restart; the persisted fingerprint suppresses the rewrite.
    let mut restarted = support::harness_with_store(
        workdir.path(),
        "fleet-server/0",
        "10.0.0.1",
        UnitConfig::default(),
        support::SharedProbe::leader(),
        store,
    );
    restarted.issuer.grant(support::material());

    let status = restarted.driver.handle(Event::Tick).unwrap();
    assert_eq!(status, UnitStatus::Active);
    assert_eq!(restarted.sink.commits(), 0);
}

#[test]
fn config_change_that_alters_topology_commits_exactly_once() {
    let workdir = tempfile::tempdir().unwrap();
    let mut h = support::harness(
        workdir.path(),
        "fleet-server/0",
        "10.0.0.1",
        UnitConfig::default(),
        support::SharedProbe::leader(),
    );
    h.issuer.grant(support::material());
    for event in converging_events() {
        h.driver.handle(event).unwrap();
    }
    assert_eq!(h.sink.commits(), 1);

    let scaled = UnitConfig {
        worker_counts: 3,
        ..UnitConfig::default()
    };
    h.driver.handle(Event::ConfigChanged(scaled.clone())).unwrap();
    assert_eq!(h.sink.commits(), 2);

    let https = h.sink.last().unwrap();
    let https = https.frontend("https").unwrap();
    assert_eq!(https.servers.len(), 3, "appserver scales with the workers");

    // The same config again is a no-op.
    h.driver.handle(Event::ConfigChanged(scaled)).unwrap();
    assert_eq!(h.sink.commits(), 2);
}
