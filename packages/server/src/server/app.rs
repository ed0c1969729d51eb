//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::common::AppContext;
use crate::kernel::ServerDeps;
use crate::server::routes::{
    csv_info_handler, errors_handler, health_handler, index_handler, positions_handler,
    status_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: ServerDeps,
    pub context: AppContext,
}

impl AxumAppState {
    pub fn new(deps: ServerDeps, context: AppContext) -> Self {
        Self { deps, context }
    }
}

/// Build the Axum application router
///
/// Every route is read-only and served whatever the storage backend.
pub fn build_app(state: AxumAppState) -> Router {
    // CORS configuration - reporting is public, allow any origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(index_handler))
        .route("/status", get(status_handler))
        .route("/csv-info", get(csv_info_handler))
        .route("/positions", get(positions_handler))
        .route("/errors", get(errors_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
