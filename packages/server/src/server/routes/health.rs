use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AxumAppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    backend: &'static str,
    storage: StorageHealth,
}

#[derive(Debug, Serialize)]
pub struct StorageHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Checks that the storage backend answers a cheap read within 5 seconds.
///
/// Returns 200 OK if storage is healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let store = state.deps.store.as_ref();

    let storage = match tokio::time::timeout(Duration::from_secs(5), store.count_errors()).await {
        Ok(Ok(_)) => StorageHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => StorageHealth {
            status: "error".to_string(),
            error: Some(format!("Read failed: {:#}", e)),
        },
        Err(_) => StorageHealth {
            status: "error".to_string(),
            error: Some("Read timeout (>5s)".to_string()),
        },
    };

    let is_healthy = storage.status == "ok";

    let (status_code, overall_status) = if is_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            backend: store.backend_name(),
            storage,
        }),
    )
}
