//! Server dependencies (using traits for testability)
//!
//! This module provides the dependency container shared by the pollers and
//! the HTTP handlers. All external services use trait abstractions.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use transit_client::{Line, Position, TransitClient};

use crate::kernel::{BasePositionStore, BaseTransitApi};

// =============================================================================
// TransitClient Adapter (implements BaseTransitApi trait)
// =============================================================================

/// Wrapper around TransitClient that implements BaseTransitApi trait
pub struct TransitAdapter(pub Arc<TransitClient>);

impl TransitAdapter {
    pub fn new(client: Arc<TransitClient>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BaseTransitApi for TransitAdapter {
    async fn fetch_lines(&self) -> Result<Vec<Line>> {
        Ok(self.0.fetch_lines().await?)
    }

    async fn fetch_positions(&self, line_id: &str) -> Result<Vec<Position>> {
        Ok(self.0.fetch_positions(line_id).await?)
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Dependencies shared by every poller and request handler
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BasePositionStore>,
    pub transit: Arc<dyn BaseTransitApi>,
}

impl ServerDeps {
    pub fn new(store: Arc<dyn BasePositionStore>, transit: Arc<dyn BaseTransitApi>) -> Self {
        Self { store, transit }
    }
}
