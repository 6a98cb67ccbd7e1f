//! REST client tests against a wiremock Icinga API.

use kube_icinga::models::{ObjectDefinition, MANAGED_HOST_FILTER, MANAGED_SERVICE_FILTER};
use kube_icinga::{ClientError, HttpIcingaClient, Icinga, IcingaClient, IcingaConfig};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

/// base64("root:secret")
const AUTH: &str = "Basic cm9vdDpzZWNyZXQ=";

fn client_for(server: &MockServer) -> HttpIcingaClient {
    let config = IcingaConfig {
        url: server.uri(),
        username: "root".into(),
        password: "secret".into(),
        accept_invalid_certs: false,
        timeout_secs: Some(5),
    };
    HttpIcingaClient::new(&config).unwrap()
}

fn created() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({"results": [{"code": 200, "status": "Object was created"}]}))
}

// =============================================================================
// Lookups
// =============================================================================

#[tokio::test]
async fn test_get_host_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/objects/hosts/n1"))
        .and(header("authorization", AUTH))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "name": "n1",
                "type": "Host",
                "attrs": {"name": "n1", "address": "10.0.0.1"},
                "joins": {},
                "meta": {}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let host = client_for(&server).get_host("n1").await.unwrap();
    assert_eq!(host.name, "n1");
    assert_eq!(host.object_type, "Host");
    assert_eq!(host.attr_str("address"), Some("10.0.0.1"));
}

#[tokio::test]
async fn test_lookup_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/objects/hostgroups/default"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": 404,
            "status": "No objects found."
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).get_host_group("default").await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn test_lookup_empty_results_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/objects/checkcommands/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let err = client_for(&server).get_check_command("ping").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_server_error_is_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/objects/servicegroups/web"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_service_group("web").await.unwrap_err();
    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_get_service_uses_composite_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/objects/services/n1!http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "name": "n1!http",
                "type": "Service",
                "attrs": {"name": "http", "host_name": "n1"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = client_for(&server).get_service("n1", "http").await.unwrap();
    assert_eq!(service.host_name(), Some("n1"));
    assert_eq!(service.short_name(), "http");
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn test_create_host_sends_definition() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/objects/hosts/n1"))
        .and(body_json(json!({
            "attrs": {"check_command": "ping", "address": "10.0.0.1"},
            "templates": ["generic-host"]
        })))
        .respond_with(created())
        .expect(1)
        .mount(&server)
        .await;

    let attrs = json!({"check_command": "ping", "address": "10.0.0.1"})
        .as_object()
        .cloned()
        .unwrap();
    let definition = ObjectDefinition::new(attrs, vec!["generic-host".into()]);
    let result = client_for(&server).create_host("n1", &definition).await.unwrap();
    assert_eq!(result["results"][0]["code"], 200);
}

#[tokio::test]
async fn test_create_groups_send_display_name() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/objects/hostgroups/kube-system"))
        .and(body_json(json!({"attrs": {"display_name": "kube-system"}})))
        .respond_with(created())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/objects/servicegroups/kube-system"))
        .and(body_json(json!({"attrs": {"display_name": "kube-system"}})))
        .respond_with(created())
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.create_host_group("kube-system", "kube-system").await.unwrap();
    client
        .create_service_group("kube-system", "kube-system")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_service_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/objects/services/n1!kubelet"))
        .and(body_json(json!({"attrs": {"check_command": "tcp"}, "templates": []})))
        .respond_with(created())
        .expect(1)
        .mount(&server)
        .await;

    let attrs = json!({"check_command": "tcp"}).as_object().cloned().unwrap();
    client_for(&server)
        .create_service("n1", "kubelet", &ObjectDefinition::new(attrs, vec![]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_deletes_cascade() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/objects/hosts/n1"))
        .and(query_param("cascade", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/objects/services/n1!http"))
        .and(query_param("cascade", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete_host("n1").await.unwrap();
    client.delete_service("n1", "http").await.unwrap();
}

// =============================================================================
// Filtered listings
// =============================================================================

#[tokio::test]
async fn test_list_hosts_with_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/objects/hosts"))
        .and(header("x-http-method-override", "GET"))
        .and(body_json(json!({"filter": MANAGED_HOST_FILTER})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"name": "n1", "type": "Host", "attrs": {"name": "n1"}},
                {"name": "n2", "type": "Host", "attrs": {"name": "n2"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hosts = client_for(&server).list_hosts(MANAGED_HOST_FILTER).await.unwrap();
    let names: Vec<&str> = hosts.iter().map(|h| h.short_name()).collect();
    assert_eq!(names, vec!["n1", "n2"]);
}

// =============================================================================
// Reconciler over HTTP
// =============================================================================

#[tokio::test]
async fn test_apply_host_group_creates_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/objects/hostgroups/default"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/objects/hostgroups/default"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let icinga = Icinga::new(Arc::new(client_for(&server)));
    icinga.apply_host_group("default").await.unwrap();
}

#[tokio::test]
async fn test_cleanup_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/objects/services"))
        .and(body_json(json!({"filter": MANAGED_SERVICE_FILTER})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"name": "n1!http", "type": "Service", "attrs": {"name": "http", "host_name": "n1"}}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/objects/hosts"))
        .and(body_json(json!({"filter": MANAGED_HOST_FILTER})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"name": "n1", "type": "Host", "attrs": {"name": "n1"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/objects/services/n1!http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/objects/hosts/n1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let icinga = Icinga::new(Arc::new(client_for(&server)));
    let report = icinga.cleanup().await.unwrap();
    assert_eq!(report.services.deleted, 1);
    assert_eq!(report.hosts.deleted, 1);
}
