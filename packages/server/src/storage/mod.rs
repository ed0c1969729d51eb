//! Persistence backends for positions and errors.

use anyhow::{Context, Result};
use std::sync::Arc;

pub mod csv_store;
pub mod postgres_store;

pub use csv_store::CsvPositionStore;
pub use postgres_store::PostgresPositionStore;

use crate::config::{Config, StorageBackend};
use crate::kernel::BasePositionStore;

/// Open the backend selected by configuration
pub async fn open_store(config: &Config) -> Result<Arc<dyn BasePositionStore>> {
    match config.storage_backend {
        StorageBackend::Csv => {
            let store = CsvPositionStore::open(&config.csv_dir, &config.error_log_path).await?;
            tracing::info!(dir = %config.csv_dir.display(), "Using CSV storage");
            Ok(Arc::new(store))
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set for the postgres backend")?;
            let store =
                PostgresPositionStore::connect(url, config.database_max_connections).await?;
            tracing::info!("Using PostgreSQL storage");
            Ok(Arc::new(store))
        }
    }
}
