use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use solewms_api::{WarehouseService, app};
use solewms_infra::WarehouseConfig;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let service = Arc::new(WarehouseService::new(WarehouseConfig::default()).unwrap());
        let app = app::build_app(service);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn register_bin(server: &TestServer, client: &reqwest::Client, code: &str, size: &str, capacity: u32) {
    let (status, _) = post(
        client,
        server.url("/bins"),
        json!({ "bin_code": code, "size_class": size, "capacity": capacity, "actor": "Branch Manager" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn create_unit(server: &TestServer, client: &reqwest::Client, id: &str, sku: &str, qty: u32) {
    let (status, body) = post(
        client,
        server.url("/units"),
        json!({
            "unit_id": id,
            "source_ref": "ASN-1001",
            "sku": sku,
            "product_name": "Air Jordan 1",
            "size_class": "M",
            "quantity": qty,
            "actor": "Ayesha"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "Arrived");
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn accept_pick_and_audit_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_bin(&server, &client, "A-01-01", "M", 50).await;
    register_bin(&server, &client, "A-01-02", "M", 30).await;
    create_unit(&server, &client, "BP-001", "NK-AJ1-001", 40).await;

    let (status, body) = post(&client, server.url("/units/BP-001/accept"), json!({ "actor": "Ayesha" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decision"]["chosen_bin_code"], "A-01-01");
    assert_eq!(body["decision"]["reason"], "Fit");
    assert_eq!(body["unit"]["state"], "Stored");

    let (_, bin) = get(&client, server.url("/bins/A-01-01")).await;
    assert_eq!(bin["occupied"], 40);

    let (status, _) = post(&client, server.url("/units/BP-001/locate"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &client,
        server.url("/units/BP-001/pick"),
        json!({ "scanned_code": "WRONG-SKU", "actor": "Picker 7" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "scan_mismatch");

    let (status, body) = post(
        &client,
        server.url("/units/BP-001/pick"),
        json!({ "scanned_code": "NK-AJ1-001", "actor": "Picker 7" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "Picked");

    let (_, bin) = get(&client, server.url("/bins/A-01-01")).await;
    assert_eq!(bin["occupied"], 0);

    let (status, page) = get(&client, server.url("/activity?unit_id=BP-001&action=picked")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["entries"][0]["actor"], "Picker 7");
}

#[tokio::test]
async fn illegal_transition_and_unknown_unit_map_to_http_errors() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_unit(&server, &client, "BP-001", "NK-AJ1-001", 5).await;

    let (status, body) = post(&client, server.url("/units/BP-001/handoff"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "illegal_transition");

    let (status, body) = get(&client, server.url("/units/BP-404")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unit_not_found");

    let (status, body) = get(&client, server.url("/bins/bad_code")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_bin_code");
}

#[tokio::test]
async fn reassignment_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_bin(&server, &client, "A-01-01", "M", 50).await;
    register_bin(&server, &client, "A-01-05", "M", 50).await;
    create_unit(&server, &client, "BP-001", "NK-AJ1-001", 10).await;
    create_unit(&server, &client, "BP-002", "NK-AJ1-002", 20).await;
    post(&client, server.url("/units/BP-001/accept"), json!({})).await;
    post(&client, server.url("/units/BP-002/accept"), json!({})).await;

    let (status, body) = post(
        &client,
        server.url("/reassignments"),
        json!({ "unit_id_a": "BP-001", "unit_id_b": "BP-001", "reason": "oops" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "self_swap");

    let (status, record) = post(
        &client,
        server.url("/reassignments"),
        json!({ "unit_id_a": "BP-001", "unit_id_b": "BP-002", "reason": "FIFO rotation", "actor": "Lead" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["to_bin_a"], "A-01-05");
    assert_eq!(record["to_bin_b"], "A-01-01");

    let (_, records) = get(&client, server.url("/reassignments?unit_id=BP-002")).await;
    assert_eq!(records.as_array().unwrap().len(), 1);

    let (_, summary) = get(&client, server.url("/summary")).await;
    assert_eq!(summary["total_occupied"], 30);
}

#[tokio::test]
async fn bin_admin_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register_bin(&server, &client, "A-01-01", "M", 50).await;

    let (status, body) = post(&client, server.url("/bins/A-01-01/maintenance"), json!({ "enabled": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
    assert_eq!(body["bin"]["status"], "Maintenance");

    let (_, body) = post(&client, server.url("/bins/A-01-01/archive"), json!({})).await;
    assert_eq!(body["changed"], true);

    let (_, bins) = get(&client, server.url("/bins?size_class=M")).await;
    assert!(bins.as_array().unwrap().is_empty());

    let (_, body) = post(&client, server.url("/bins/A-01-01/restore"), json!({})).await;
    assert_eq!(body["changed"], true);

    let (status, body) = post(
        &client,
        server.url("/bins"),
        json!({ "bin_code": "A-01-01", "size_class": "M", "capacity": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_bin");
}
