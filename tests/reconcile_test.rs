//! End-to-end reconciliation tests
//!
//! Runs real ticks against mocked Mesos masters and a mocked Consul agent.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leader_beacon::{
    coordinator::MesosClient,
    registry::{AgentAddress, ConsulRegistry},
    BeaconConfig, BeaconError, Endpoint, LeaderKey, Reconciler, SyncOutcome,
};

const REGISTER: &str = "/v1/agent/service/register";

fn url_of(server: &MockServer) -> Url {
    Url::parse(&server.uri()).unwrap()
}

fn endpoint_of(server: &MockServer) -> Endpoint {
    let addr = server.address();
    Endpoint::new(addr.ip().to_string(), addr.port())
}

async fn standby_master() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

async fn leading_master(frameworks: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/master/state.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "leader": format!("master@{}", server.address()),
            "frameworks": frameworks,
        })))
        .mount(&server)
        .await;
    server
}

fn reconciler(
    masters: &[&MockServer],
    consul: &MockServer,
    frameworks: &[&str],
) -> Reconciler<MesosClient, ConsulRegistry> {
    let config = BeaconConfig {
        candidates: masters.iter().map(|m| url_of(m)).collect(),
        frameworks: frameworks.iter().map(|f| f.to_string()).collect(),
        service_name: "coordinator".to_string(),
        agent: AgentAddress::Fixed(url_of(consul)),
        request_timeout: Some(Duration::from_secs(5)),
        ..BeaconConfig::default()
    };
    let mesos = MesosClient::new(config.candidates.clone(), config.request_timeout).unwrap();
    let registry =
        ConsulRegistry::new(config.agent.clone(), None, config.request_timeout).unwrap();
    Reconciler::new(mesos, registry, &config)
}

#[tokio::test]
async fn test_leader_published_once_across_ticks() {
    let standby = standby_master().await;
    let leader = leading_master(json!([])).await;
    let leader_ep = endpoint_of(&leader);

    let consul = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(REGISTER))
        .and(body_partial_json(json!({
            "ID": "coordinator:master",
            "Name": "coordinator",
            "Tags": ["master"],
            "Address": leader_ep.host,
            "Port": leader_ep.port,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&consul)
        .await;

    let reconciler = reconciler(&[&standby, &leader], &consul, &[]);

    let first = reconciler.reconcile_once().await;
    assert_eq!(first.leader, Some(leader_ep.clone()));
    assert_eq!(
        first.outcome(&LeaderKey::Coordinator),
        Some(&SyncOutcome::Published(leader_ep.clone()))
    );

    let second = reconciler.reconcile_once().await;
    assert_eq!(
        second.outcome(&LeaderKey::Coordinator),
        Some(&SyncOutcome::Unchanged)
    );
    assert_eq!(
        reconciler.cache().await.get(&LeaderKey::Coordinator),
        Some(&leader_ep)
    );
}

#[tokio::test]
async fn test_framework_failures_are_isolated() {
    let leader = leading_master(json!([
        { "name": "svcA", "webui_url": "http://10.0.0.5:9090/ui" },
        { "name": "svcB", "webui_url": "http://:badport" },
    ]))
    .await;

    let consul = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(REGISTER))
        .and(body_partial_json(json!({ "ID": "coordinator:framework:svcA" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&consul)
        .await;
    Mock::given(method("PUT"))
        .and(path(REGISTER))
        .and(body_partial_json(json!({ "ID": "coordinator:master" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&consul)
        .await;

    let reconciler = reconciler(&[&leader], &consul, &["svcA", "svcB", "svcC"]);
    let report = reconciler.reconcile_once().await;

    assert_eq!(
        report.outcome(&LeaderKey::service("svcA")),
        Some(&SyncOutcome::Published(Endpoint::new("10.0.0.5", 9090)))
    );
    assert!(matches!(
        report.outcome(&LeaderKey::service("svcB")),
        Some(SyncOutcome::Failed(BeaconError::MalformedAddress { .. }))
    ));
    assert_eq!(
        report.outcome(&LeaderKey::service("svcC")),
        Some(&SyncOutcome::Failed(BeaconError::NotFound("svcC".to_string())))
    );

    let cache = reconciler.cache().await;
    assert_eq!(cache.len(), 2);
    assert!(cache.get(&LeaderKey::service("svcB")).is_none());
}

#[tokio::test]
async fn test_registry_rejection_retried_next_tick() {
    let leader = leading_master(json!([])).await;

    let consul = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(REGISTER))
        .respond_with(ResponseTemplate::new(500).set_body_string("agent unavailable"))
        .up_to_n_times(1)
        .mount(&consul)
        .await;
    Mock::given(method("PUT"))
        .and(path(REGISTER))
        .respond_with(ResponseTemplate::new(200))
        .mount(&consul)
        .await;

    let reconciler = reconciler(&[&leader], &consul, &[]);

    let first = reconciler.reconcile_once().await;
    assert!(matches!(
        first.outcome(&LeaderKey::Coordinator),
        Some(SyncOutcome::Failed(BeaconError::PublishFailed { .. }))
    ));
    assert!(reconciler.cache().await.is_empty());

    let second = reconciler.reconcile_once().await;
    assert!(matches!(
        second.outcome(&LeaderKey::Coordinator),
        Some(SyncOutcome::Published(_))
    ));
    assert_eq!(consul.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_no_reachable_master_publishes_nothing() {
    let standby = standby_master().await;

    let consul = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&consul)
        .await;

    let reconciler = reconciler(&[&standby], &consul, &["marathon"]);
    let report = reconciler.reconcile_once().await;

    assert!(matches!(report.skipped, Some(BeaconError::NoLeader(_))));
    assert!(report.outcomes.is_empty());
    assert!(reconciler.cache().await.is_empty());
}
