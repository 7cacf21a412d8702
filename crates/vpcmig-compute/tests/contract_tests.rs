//! Contract tests for HttpComputeClient against a wiremock compute endpoint.
//!
//! Paths, verbs, and payload shapes follow the provider's `compute/v1` REST
//! surface. The client is pointed at `{mock}/compute/v1/`.
//!
//! ## Endpoints Tested
//!
//! | Method | Path (relative to project) | Test |
//! |--------|----------------------------|------|
//! | GET    | `zones/{z}/instances/{name}` | `get_instance_*` |
//! | POST   | `zones/{z}/instances` | `insert_instance_*` |
//! | POST   | `zones/{z}/instances/{name}/detachDisk` | `detach_disk_*` |
//! | GET    | `regions/{r}/addresses` | `list_addresses_*` |
//! | POST   | `zones/{z}/instanceGroups/{g}/listInstances` | `list_group_instances_*` |
//! | POST   | `regions/{r}/instanceGroupManagers/{m}/listManagedInstances` | `list_managed_instances_*` |
//! | POST   | `regions/{r}/targetPools/{p}/addInstance` | `add_instances_to_target_pool_*` |
//! | PATCH  | `global/backendServices/{name}` | `patch_backend_service_*` |
//! | GET    | `zones/{z}/operations/{op}` | `operation_*` |

use std::sync::Arc;

use serde_json::json;
use vpcmig_compute::{
    AttachedDisk, BackendServiceConfig, ComputeApi, ComputeApiConfig, ComputeError,
    HttpComputeClient, InstanceConfig,
};
use vpcmig_core::Scope;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "/compute/v1/projects/proj";

fn test_config(mock_server: &MockServer) -> ComputeApiConfig {
    ComputeApiConfig::local_mock(&mock_server.uri(), "test-token").unwrap()
}

fn test_client(mock_server: &MockServer) -> HttpComputeClient {
    HttpComputeClient::new(&test_config(mock_server)).unwrap()
}

fn running_op(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "status": "RUNNING",
        "zone": "https://www.googleapis.com/compute/v1/projects/proj/zones/us-east1-b"
    })
}

// ── GET zones/{z}/instances/{name} ───────────────────────────────────

#[tokio::test]
async fn get_instance_sends_bearer_token_and_decodes_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances/vm-1")))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "vm-1",
            "status": "RUNNING",
            "machineType": "zones/us-east1-b/machineTypes/e2-small",
            "networkInterfaces": [{
                "network": "https://www.googleapis.com/compute/v1/projects/proj/global/networks/legacy",
                "networkIP": "10.240.0.2",
                "accessConfigs": [{"name": "External NAT", "natIP": "35.1.2.3"}]
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let vm = client.get_instance("proj", "us-east1-b", "vm-1").await.unwrap();
    assert_eq!(vm.name, "vm-1");
    assert_eq!(vm.external_ip(), Some("35.1.2.3"));
    assert!(vm.extra.contains_key("machineType"));
}

#[tokio::test]
async fn get_instance_maps_404_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances/gone")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "The resource was not found"}
        })))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .get_instance("proj", "us-east1-b", "gone")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected not found, got {err}");
}

#[tokio::test]
async fn throttled_read_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances/vm-1")))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances/vm-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "vm-1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let vm = test_client(&mock_server)
        .get_instance("proj", "us-east1-b", "vm-1")
        .await
        .unwrap();
    assert_eq!(vm.name, "vm-1");
}

#[tokio::test]
async fn get_instance_handles_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances/vm-1")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .get_instance("proj", "us-east1-b", "vm-1")
        .await
        .unwrap_err();
    assert!(matches!(err, ComputeError::Deserialization { .. }));
}

// ── POST zones/{z}/instances ─────────────────────────────────────────

#[tokio::test]
async fn insert_instance_posts_config_and_returns_operation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances")))
        .and(body_partial_json(json!({
            "name": "vm-1",
            "networkInterfaces": [{"subnetwork": "projects/proj/regions/us-east1/subnetworks/sub"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_op("op-insert")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config: InstanceConfig = serde_json::from_value(json!({
        "name": "vm-1",
        "networkInterfaces": [{"subnetwork": "projects/proj/regions/us-east1/subnetworks/sub"}]
    }))
    .unwrap();
    let op = test_client(&mock_server)
        .insert_instance("proj", "us-east1-b", &config)
        .await
        .unwrap();
    assert_eq!(op.name, "op-insert");
    assert_eq!(op.scope(), Scope::Zone("us-east1-b".into()));
}

#[tokio::test]
async fn insert_instance_rejected_address_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Invalid value for field 'resource.networkInterfaces[0].accessConfigs[0].natIP': '35.1.2.3'."
            }
        })))
        .mount(&mock_server)
        .await;

    let config: InstanceConfig = serde_json::from_value(json!({"name": "vm-1"})).unwrap();
    let err = test_client(&mock_server)
        .insert_instance("proj", "us-east1-b", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ComputeError::Api { status: 400, .. }));
    assert!(err.is_invalid_address());
}

// ── POST zones/{z}/instances/{name}/detachDisk ───────────────────────

#[tokio::test]
async fn detach_disk_sends_device_name_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances/vm-1/detachDisk")))
        .and(query_param("deviceName", "data-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_op("op-detach")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let op = test_client(&mock_server)
        .detach_disk("proj", "us-east1-b", "vm-1", "data-1")
        .await
        .unwrap();
    assert_eq!(op.name, "op-detach");
}

#[tokio::test]
async fn attach_disk_posts_disk_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances/vm-1/attachDisk")))
        .and(body_partial_json(json!({
            "deviceName": "data-1",
            "source": "projects/proj/zones/us-east1-b/disks/data-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_op("op-attach")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let disk: AttachedDisk = serde_json::from_value(json!({
        "deviceName": "data-1",
        "source": "projects/proj/zones/us-east1-b/disks/data-1",
        "mode": "READ_WRITE"
    }))
    .unwrap();
    test_client(&mock_server)
        .attach_disk("proj", "us-east1-b", "vm-1", &disk)
        .await
        .unwrap();
}

// ── GET regions/{r}/addresses ────────────────────────────────────────

#[tokio::test]
async fn list_addresses_follows_page_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/regions/us-east1/addresses")))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "addr-b", "address": "35.0.0.2"}]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/regions/us-east1/addresses")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "addr-a", "address": "35.0.0.1"}],
            "nextPageToken": "page-2"
        })))
        .with_priority(2)
        .expect(1)
        .mount(&mock_server)
        .await;

    let addresses = test_client(&mock_server)
        .list_addresses("proj", "us-east1")
        .await
        .unwrap();
    let names: Vec<&str> = addresses.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["addr-a", "addr-b"]);
}

#[tokio::test]
async fn list_addresses_tolerates_missing_items() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/regions/us-east1/addresses")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "compute#addressList"})))
        .mount(&mock_server)
        .await;

    let addresses = test_client(&mock_server)
        .list_addresses("proj", "us-east1")
        .await
        .unwrap();
    assert!(addresses.is_empty());
}

// ── POST zones/{z}/instanceGroups/{g}/listInstances ──────────────────

#[tokio::test]
async fn list_group_instances_returns_member_links() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!(
            "{BASE}/zones/us-east1-b/instanceGroups/ig-1/listInstances"
        )))
        .and(body_json(json!({"instanceState": "ALL"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"instance": "projects/proj/zones/us-east1-b/instances/vm-1", "status": "RUNNING"},
                {"instance": "projects/proj/zones/us-east1-b/instances/vm-2", "status": "TERMINATED"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let members = test_client(&mock_server)
        .list_group_instances("proj", "us-east1-b", "ig-1")
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
    assert!(members[1].ends_with("/vm-2"));
}

// ── POST regions/{r}/instanceGroupManagers/{m}/listManagedInstances ──

#[tokio::test]
async fn list_managed_instances_reads_instance_links() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!(
            "{BASE}/regions/us-east1/instanceGroupManagers/rmig/listManagedInstances"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "managedInstances": [
                {"instance": "projects/proj/zones/us-east1-c/instances/rmig-abcd", "currentAction": "NONE"}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let members = test_client(&mock_server)
        .list_managed_instances("proj", &Scope::Region("us-east1".into()), "rmig")
        .await
        .unwrap();
    assert_eq!(members, vec!["projects/proj/zones/us-east1-c/instances/rmig-abcd".to_string()]);
}

#[tokio::test]
async fn list_managed_instances_tolerates_empty_manager() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!(
            "{BASE}/zones/us-east1-b/instanceGroupManagers/mig/listManagedInstances"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let members = test_client(&mock_server)
        .list_managed_instances("proj", &Scope::Zone("us-east1-b".into()), "mig")
        .await
        .unwrap();
    assert!(members.is_empty());
}

// ── POST regions/{r}/targetPools/{p}/addInstance ─────────────────────

#[tokio::test]
async fn add_instances_to_target_pool_wraps_links() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{BASE}/regions/us-east1/targetPools/pool/addInstance")))
        .and(body_json(json!({
            "instances": [{"instance": "projects/proj/zones/us-east1-b/instances/vm-1"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-pool",
            "status": "DONE",
            "region": "https://www.googleapis.com/compute/v1/projects/proj/regions/us-east1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let op = test_client(&mock_server)
        .add_instances_to_target_pool(
            "proj",
            "us-east1",
            "pool",
            &["projects/proj/zones/us-east1-b/instances/vm-1".to_string()],
        )
        .await
        .unwrap();
    assert!(op.is_done());
    assert_eq!(op.scope(), Scope::Region("us-east1".into()));
}

// ── PATCH global/backendServices/{name} ──────────────────────────────

#[tokio::test]
async fn patch_backend_service_uses_patch_verb() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{BASE}/global/backendServices/web")))
        .and(body_partial_json(json!({
            "backends": [{"group": "projects/proj/zones/us-east1-b/instanceGroups/ig-1"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-patch",
            "status": "DONE"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let patch: BackendServiceConfig = serde_json::from_value(json!({
        "name": "web",
        "backends": [{"group": "projects/proj/zones/us-east1-b/instanceGroups/ig-1"}]
    }))
    .unwrap();
    test_client(&mock_server)
        .patch_backend_service("proj", &Scope::Global, "web", &patch)
        .await
        .unwrap();
}

// ── GET zones/{z}/operations/{op} ────────────────────────────────────

#[tokio::test]
async fn operation_waiter_polls_until_done() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{BASE}/zones/us-east1-b/instances/vm-1/stop")))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_op("op-stop")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/zones/us-east1-b/operations/op-stop")))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_op("op-stop")))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/zones/us-east1-b/operations/op-stop")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-stop",
            "status": "DONE",
            "zone": "https://www.googleapis.com/compute/v1/projects/proj/zones/us-east1-b"
        })))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let client: Arc<dyn ComputeApi> = Arc::new(HttpComputeClient::new(&config).unwrap());
    let op = client.stop_instance("proj", "us-east1-b", "vm-1").await.unwrap();
    let done = config.waiter().wait(client.as_ref(), "proj", op).await.unwrap();
    assert!(done.is_done());
}

#[tokio::test]
async fn operation_error_payload_surfaces_as_operation_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/zones/us-east1-b/operations/op-fail")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-fail",
            "status": "DONE",
            "zone": "https://www.googleapis.com/compute/v1/projects/proj/zones/us-east1-b",
            "targetLink": "https://www.googleapis.com/compute/v1/projects/proj/zones/us-east1-b/instances/vm-1",
            "error": {"errors": [{"code": "ZONE_RESOURCE_POOL_EXHAUSTED", "message": "no capacity"}]}
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server);
    let client = HttpComputeClient::new(&config).unwrap();
    let pending: vpcmig_compute::Operation =
        serde_json::from_value(running_op("op-fail")).unwrap();
    let err = config
        .waiter()
        .wait(&client, "proj", pending)
        .await
        .unwrap_err();
    match err {
        ComputeError::Operation(failure) => {
            assert!(failure.has_code("ZONE_RESOURCE_POOL_EXHAUSTED"));
        }
        other => panic!("expected operation error, got {other}"),
    }
}

#[tokio::test]
async fn server_error_is_not_retried_and_keeps_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{BASE}/global/instanceTemplates/tmpl")))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .delete_instance_template("proj", "tmpl")
        .await
        .unwrap_err();
    match err {
        ComputeError::Api { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "backend unavailable");
        }
        other => panic!("expected API error, got {other}"),
    }
}
