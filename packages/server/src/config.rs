use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which persistence backend the tracker writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// One `;`-delimited file per day plus a plain-text error log
    Csv,
    /// `positions` and `errors` tables in PostgreSQL
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" | "file" => Ok(Self::Csv),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => bail!("unknown storage backend '{}' (expected 'csv' or 'postgres')", other),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub csv_dir: PathBuf,
    pub error_log_path: PathBuf,
    pub transit_api_base_url: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let storage_backend: StorageBackend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "csv".to_string())
            .parse()
            .context("STORAGE_BACKEND must be 'csv' or 'postgres'")?;

        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE_BACKEND=postgres");
        }

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            storage_backend,
            database_url,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            csv_dir: env::var("CSV_DIR")
                .unwrap_or_else(|_| "csv".to_string())
                .into(),
            error_log_path: env::var("ERROR_LOG_PATH")
                .unwrap_or_else(|_| "error_log.txt".to_string())
                .into(),
            transit_api_base_url: env::var("TRANSIT_API_BASE_URL")
                .unwrap_or_else(|_| transit_client::DEFAULT_BASE_URL.to_string()),
            poll_interval: Duration::from_millis(
                env::var("POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .context("POLL_INTERVAL_MS must be a valid number")?,
            ),
            http_timeout: Duration::from_secs(
                env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("HTTP_TIMEOUT_SECS must be a valid number")?,
            ),
        })
    }
}
