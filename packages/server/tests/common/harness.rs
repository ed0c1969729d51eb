//! PostgreSQL harness backed by testcontainers.
//!
//! One container is started for the whole test binary; every test gets its
//! own freshly migrated database inside it so tests never see each other's
//! rows.

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tracker_core::storage::PostgresPositionStore;

struct SharedPostgres {
    server_url: String,
    // Keep the container alive for the entire test run
    _container: ContainerAsync<Postgres>,
}

static SHARED_POSTGRES: OnceCell<SharedPostgres> = OnceCell::const_new();
static NEXT_DATABASE: AtomicUsize = AtomicUsize::new(0);

impl SharedPostgres {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --ignored --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let container = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;

        Ok(Self {
            server_url: format!("postgresql://postgres:postgres@{}:{}", host, port),
            _container: container,
        })
    }
}

/// A migrated, empty database of its own
pub struct PostgresHarness {
    pub db_url: String,
    pub store: PostgresPositionStore,
}

impl PostgresHarness {
    pub async fn new() -> Result<Self> {
        let shared = SHARED_POSTGRES
            .get_or_try_init(SharedPostgres::init)
            .await?;

        let name = format!(
            "tracker_test_{}_{}",
            std::process::id(),
            NEXT_DATABASE.fetch_add(1, Ordering::SeqCst)
        );

        let admin = PgPool::connect(&format!("{}/postgres", shared.server_url))
            .await
            .context("Failed to connect to Postgres")?;
        sqlx::query(&format!("CREATE DATABASE {}", name))
            .execute(&admin)
            .await
            .context("Failed to create test database")?;
        admin.close().await;

        let db_url = format!("{}/{}", shared.server_url, name);
        let store = PostgresPositionStore::connect(&db_url, 5).await?;

        Ok(Self { db_url, store })
    }
}
