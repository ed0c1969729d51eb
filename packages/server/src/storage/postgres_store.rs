use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::common::{
    DedupKey, ErrorRecord, PartitionInfo, PositionRecord, RecordOrder, RecordScope,
};
use crate::kernel::BasePositionStore;

/// Position store backed by the `positions` and `errors` tables.
///
/// Dedup is enforced twice: `record_exists` for the poller's check, and the
/// `positions_dedup_key` unique constraint so a racing insert is dropped
/// instead of duplicated.
pub struct PostgresPositionStore {
    pool: PgPool,
}

impl PostgresPositionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn scope_date(scope: RecordScope) -> Option<NaiveDate> {
    match scope {
        RecordScope::All => None,
        RecordScope::Day(date) => Some(date),
    }
}

fn position_from_row(r: &PgRow) -> PositionRecord {
    PositionRecord {
        service_date: r.get("service_date"),
        line_id: r.get("linea"),
        unit_id: r.get("unidad"),
        latitude: r.get("lat"),
        longitude: r.get("lon"),
        observation_time: r.get("hora"),
        recorded_at: Some(r.get("recorded_at")),
    }
}

#[async_trait]
impl BasePositionStore for PostgresPositionStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn record_exists(&self, key: &DedupKey) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM positions
                WHERE service_date = $1 AND linea = $2 AND unidad = $3 AND hora = $4
            )
            "#,
        )
        .bind(key.service_date)
        .bind(&key.line_id)
        .bind(&key.unit_id)
        .bind(&key.observation_time)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check for existing position")?;
        Ok(exists)
    }

    async fn append_record(&self, record: &PositionRecord) -> Result<()> {
        let recorded_at = record
            .recorded_at
            .unwrap_or_else(|| chrono::Local::now().naive_local());

        sqlx::query(
            r#"
            INSERT INTO positions (recorded_at, service_date, linea, unidad, lat, lon, hora)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ON CONSTRAINT positions_dedup_key DO NOTHING
            "#,
        )
        .bind(recorded_at)
        .bind(record.service_date)
        .bind(&record.line_id)
        .bind(&record.unit_id)
        .bind(&record.latitude)
        .bind(&record.longitude)
        .bind(&record.observation_time)
        .execute(&self.pool)
        .await
        .context("Failed to save position")?;
        Ok(())
    }

    async fn append_error(&self, message: &str) -> Result<()> {
        sqlx::query("INSERT INTO errors (message, occurred_at) VALUES ($1, $2)")
            .bind(message)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to save error")?;
        Ok(())
    }

    async fn count_records(&self, scope: RecordScope) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM positions WHERE ($1::date IS NULL OR service_date = $1)",
        )
        .bind(scope_date(scope))
        .fetch_one(&self.pool)
        .await
        .context("Failed to count positions")?;
        Ok(count as u64)
    }

    async fn list_records(
        &self,
        scope: RecordScope,
        limit: usize,
        order: RecordOrder,
    ) -> Result<Vec<PositionRecord>> {
        let sql = match order {
            RecordOrder::NewestFirst => {
                r#"
                SELECT recorded_at, service_date, linea, unidad, lat, lon, hora
                FROM positions
                WHERE ($1::date IS NULL OR service_date = $1)
                ORDER BY id DESC
                LIMIT $2
                "#
            }
            RecordOrder::OldestFirst => {
                r#"
                SELECT recorded_at, service_date, linea, unidad, lat, lon, hora
                FROM positions
                WHERE ($1::date IS NULL OR service_date = $1)
                ORDER BY id ASC
                LIMIT $2
                "#
            }
        };

        let rows = sqlx::query(sql)
            .bind(scope_date(scope))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list positions")?;

        Ok(rows.iter().map(position_from_row).collect())
    }

    async fn count_errors(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM errors")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count errors")?;
        Ok(count as u64)
    }

    async fn list_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT message, occurred_at
            FROM errors
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list errors")?;

        Ok(rows
            .into_iter()
            .map(|r| ErrorRecord {
                message: r.get("message"),
                timestamp: r.get::<DateTime<Utc>, _>("occurred_at"),
            })
            .collect())
    }

    async fn inventory(&self) -> Result<Vec<PartitionInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT service_date,
                   COUNT(*) AS row_count,
                   (ARRAY_AGG(hora ORDER BY id ASC))[1] AS first_entry_time,
                   (ARRAY_AGG(hora ORDER BY id DESC))[1] AS last_entry_time
            FROM positions
            GROUP BY service_date
            ORDER BY service_date
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to summarise positions by day")?;

        Ok(rows
            .into_iter()
            .map(|r| PartitionInfo {
                partition: r.get::<NaiveDate, _>("service_date").to_string(),
                row_count: r.get::<i64, _>("row_count") as u64,
                size_bytes: None,
                first_entry_time: r.get("first_entry_time"),
                last_entry_time: r.get("last_entry_time"),
            })
            .collect())
    }
}
