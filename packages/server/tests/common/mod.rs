// Common test utilities
// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

pub mod harness;

#[allow(unused_imports)]
pub use harness::*;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use tracker_core::storage::CsvPositionStore;

/// A CSV store rooted in a fresh temporary directory.
///
/// Keep the `TempDir` alive for as long as the store is used.
pub async fn temp_csv_store() -> (Arc<CsvPositionStore>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = CsvPositionStore::open(dir.path().join("csv"), dir.path().join("error_log.txt"))
        .await
        .expect("Failed to open CSV store");
    (Arc::new(store), dir)
}

/// Poll `done` until it holds or roughly two seconds have passed
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..400 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Issue a GET against the router and return the status and raw body
pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

/// Issue a GET and parse the body as JSON
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    let json = serde_json::from_str(&body).unwrap_or_else(|e| panic!("invalid JSON from {uri}: {e}: {body}"));
    (status, json)
}
