//! S2 — login twice, driven through the real `axum` router rather than the
//! handler function directly, since `routes::LoginRequest`'s fields are
//! crate-private.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use lws_core::address::encode_address;
use lws_core::{HttpConfig, Network};
use lws_node::NodeClient;
use lws_rpc::{build_router, AppState};
use lws_store::Storage;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

fn test_state() -> AppState {
    let dir = tempdir().unwrap();
    let storage = Storage::open(dir.path(), Network::Testnet, 1000).unwrap();
    let node = NodeClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
    AppState { storage, node, network: Network::Testnet, http: HttpConfig::default(), import_fee: 0 }
}

/// Deterministic `(address, view_key_hex, view_public)` for a given seed
/// byte, built the same way `lws_core::address` encodes any other address.
fn test_identity(seed: u8) -> (String, String) {
    let view_key = [seed; 32];
    let view_public = lws_core::address::secret_to_public(&view_key).unwrap();
    let spend_key = [seed.wrapping_add(1); 32];
    let spend_public = lws_core::address::secret_to_public(&spend_key).unwrap();
    let address = encode_address(&view_public, &spend_public, Network::Testnet).unwrap();
    (address, hex::encode(view_key))
}

async fn post_login(state: &AppState, body: Value) -> (StatusCode, Value) {
    let app = build_router(state.clone());
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let parsed = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, parsed)
}

#[tokio::test]
async fn login_twice_reports_new_address_once() {
    let state = test_state();
    let (address, view_key) = test_identity(41);

    let (status, body) = post_login(
        &state,
        json!({ "address": address, "view_key": view_key, "create_account": true, "generated_locally": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_address"], json!(true));
    assert_eq!(body["generated_locally"], json!(true));

    let (status, body) = post_login(
        &state,
        json!({ "address": address, "view_key": view_key, "create_account": true, "generated_locally": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_address"], json!(false));
    assert_eq!(body["generated_locally"], json!(true));
}

#[tokio::test]
async fn login_without_create_account_on_unknown_address_fails() {
    let state = test_state();
    let (address, view_key) = test_identity(42);

    let (status, _) = post_login(&state, json!({ "address": address, "view_key": view_key })).await;
    assert_ne!(status, StatusCode::OK);
}
