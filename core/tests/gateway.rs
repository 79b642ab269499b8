#![allow(clippy::unwrap_used)]

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use botshield_core::Gateway;
use botshield_core::GatewayConfig;
use botshield_core::HostActions;
use botshield_core::Outcome;
use botshield_core::SnapshotStore;
use botshield_core::StartupError;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

const KEY: &str = "bs-test-key";

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Allow(IpAddr),
    Challenge(IpAddr, String),
    Deny(IpAddr, String),
}

#[derive(Default)]
struct RecordingHost {
    actions: Mutex<Vec<Action>>,
}

impl RecordingHost {
    fn actions(&self) -> Vec<Action> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HostActions for RecordingHost {
    async fn allow(&self, ip: IpAddr) {
        self.actions.lock().unwrap().push(Action::Allow(ip));
    }

    async fn challenge(&self, ip: IpAddr, message: String) {
        self.actions.lock().unwrap().push(Action::Challenge(ip, message));
    }

    async fn deny(&self, ip: IpAddr, message: String) {
        self.actions.lock().unwrap().push(Action::Deny(ip, message));
    }
}

fn config_for(server: &MockServer) -> GatewayConfig {
    let mut config = GatewayConfig::new(KEY);
    config.base_url = server.uri();
    config
}

async fn mount_healthy_preamble(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/version/jar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "0.1" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{KEY}/test/")))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn mount_settings(server: &MockServer, captcha: &str, vpn: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{KEY}/settings/get")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "serverid": "srv-9",
            "captchaverify": captcha,
            "vpndetector": vpn,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn vpn_clients_are_denied_and_clean_clients_allowed() {
    let server = MockServer::start().await;
    mount_healthy_preamble(&server).await;
    mount_settings(&server, "off", "on").await;

    let vpn_ip: IpAddr = "198.51.100.1".parse().unwrap();
    let clean_ip: IpAddr = "203.0.113.7".parse().unwrap();
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{KEY}/checkip/{vpn_ip}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isVpn": true })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{KEY}/checkip/{clean_ip}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isVpn": false })))
        .mount(&server)
        .await;

    let host = Arc::new(RecordingHost::default());
    let gateway = Gateway::start(config_for(&server), host.clone()).await.unwrap();
    assert_eq!(gateway.settings().server_id, "srv-9");

    gateway.on_client_connecting(vpn_ip).await.unwrap();
    gateway.on_client_connecting(clean_ip).await.unwrap();

    let actions = host.actions();
    assert_eq!(actions.len(), 2);
    match &actions[0] {
        Action::Deny(ip, message) => {
            assert_eq!(*ip, vpn_ip);
            assert!(message.contains("vpn/proxy detected"), "message: {message}");
        }
        other => panic!("expected deny, got {other:?}"),
    }
    assert_eq!(actions[1], Action::Allow(clean_ip));
}

#[tokio::test]
async fn unverified_clients_are_challenged_with_the_verification_url() {
    let server = MockServer::start().await;
    mount_healthy_preamble(&server).await;
    mount_settings(&server, "on", "off").await;

    let ip: IpAddr = "203.0.113.7".parse().unwrap();
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{KEY}/checkverify/{ip}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "verified": "no" })))
        .mount(&server)
        .await;

    let host = Arc::new(RecordingHost::default());
    let gateway = Gateway::start(config_for(&server), host.clone()).await.unwrap();
    gateway.on_client_connecting(ip).await.unwrap();

    match host.actions().as_slice() {
        [Action::Challenge(challenged, message)] => {
            assert_eq!(*challenged, ip);
            assert!(message.contains("/server/srv-9/verify"), "message: {message}");
        }
        other => panic!("expected a single challenge, got {other:?}"),
    }
}

#[tokio::test]
async fn build_behind_the_service_minimum_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/version/jar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "99.0" })))
        .mount(&server)
        .await;

    let host = Arc::new(RecordingHost::default());
    let err = Gateway::start(config_for(&server), host).await.unwrap_err();
    assert!(matches!(err, StartupError::UnsupportedVersion { .. }));
}

#[tokio::test]
async fn rejected_api_key_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/version/jar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "0.1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{KEY}/test/")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let host = Arc::new(RecordingHost::default());
    let err = Gateway::start(config_for(&server), host).await.unwrap_err();
    assert!(matches!(err, StartupError::InvalidApiKey));
}

#[tokio::test]
async fn empty_api_key_is_fatal_before_any_request() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.api_key = "".to_string();

    let host = Arc::new(RecordingHost::default());
    let err = Gateway::start(config, host).await.unwrap_err();
    assert!(matches!(err, StartupError::Config(_)));
    assert_eq!(server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn settings_fetch_failure_falls_back_to_persisted_snapshot() {
    let server = MockServer::start().await;
    mount_healthy_preamble(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{KEY}/settings/get")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("settings.json");
    SnapshotStore::new(snapshot_path.clone())
        .save(&botshield_core::Settings {
            server_id: "srv-persisted".to_string(),
            captcha_verify_enabled: false,
            vpn_detector_enabled: false,
            fetched_at: Utc::now(),
        })
        .unwrap();

    let mut config = config_for(&server);
    config.snapshot_path = Some(snapshot_path);

    let host = Arc::new(RecordingHost::default());
    let gateway = Gateway::start(config, host.clone()).await.unwrap();
    assert_eq!(gateway.settings().server_id, "srv-persisted");

    // With both features off the client is admitted with no further calls.
    let ip: IpAddr = "203.0.113.7".parse().unwrap();
    let decision = gateway.evaluate(ip).await;
    assert_eq!(decision.outcome, Outcome::Allow);
}

#[tokio::test]
async fn reload_picks_up_new_settings_after_an_outage() {
    let server = MockServer::start().await;
    mount_healthy_preamble(&server).await;
    // First fetch fails, the retry after reload succeeds.
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/{KEY}/settings/get")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_settings(&server, "on", "on").await;

    let host = Arc::new(RecordingHost::default());
    let gateway = Gateway::start(config_for(&server), host).await.unwrap();
    assert!(gateway.settings().server_id.is_empty());

    gateway.reload().await.unwrap();
    let settings = gateway.settings();
    assert_eq!(settings.server_id, "srv-9");
    assert!(settings.captcha_verify_enabled);
    assert!(settings.vpn_detector_enabled);
}

#[tokio::test]
async fn successful_refresh_mirrors_the_snapshot_to_disk() {
    let server = MockServer::start().await;
    mount_healthy_preamble(&server).await;
    mount_settings(&server, "off", "off").await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("settings.json");
    let mut config = config_for(&server);
    config.snapshot_path = Some(snapshot_path.clone());

    let host = Arc::new(RecordingHost::default());
    Gateway::start(config, host).await.unwrap();

    let persisted = SnapshotStore::new(snapshot_path).load().unwrap().unwrap();
    assert_eq!(persisted.server_id, "srv-9");
}
