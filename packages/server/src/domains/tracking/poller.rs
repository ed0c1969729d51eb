//! Per-line position poller.
//!
//! Each poller owns one line and loops forever:
//!
//! ```text
//! FETCH ──ok──► PROCESS ──► SLEEP ──► FETCH ...
//!   │              │
//!   └──err──► record error ──► SLEEP
//! ```
//!
//! - FETCH asks the operator for the line's live positions.
//! - PROCESS stores every position whose dedup key is not stored yet. The
//!   first storage failure abandons the rest of the batch.
//! - SLEEP waits a fixed interval. There is no backoff after failures.
//!
//! A failed iteration produces exactly one error record. Nothing a poller
//! does can stop another line's poller.

use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use transit_client::Position;

use crate::common::PositionRecord;
use crate::kernel::{BasePositionStore, BaseTransitApi, ServerDeps};

/// Pause between two fetches of the same line
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What one successful iteration did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

pub struct PositionPoller {
    line_id: String,
    transit: Arc<dyn BaseTransitApi>,
    store: Arc<dyn BasePositionStore>,
    interval: Duration,
}

impl PositionPoller {
    pub fn new(line_id: impl Into<String>, deps: &ServerDeps, interval: Duration) -> Self {
        Self {
            line_id: line_id.into(),
            transit: deps.transit.clone(),
            store: deps.store.clone(),
            interval,
        }
    }

    pub fn line_id(&self) -> &str {
        &self.line_id
    }

    /// Run one FETCH + PROCESS pass.
    ///
    /// Errors are returned, not recorded; `run` does the recording.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        self.complete(self.fetch().await).await
    }

    async fn fetch(&self) -> Result<Vec<Position>> {
        self.transit.fetch_positions(&self.line_id).await
    }

    /// PROCESS a fetched batch; a failed fetch passes straight through
    async fn complete(&self, fetched: Result<Vec<Position>>) -> Result<PollOutcome> {
        self.process(&fetched?).await
    }

    async fn process(&self, positions: &[Position]) -> Result<PollOutcome> {
        let observed_at = Local::now();
        let mut outcome = PollOutcome {
            fetched: positions.len(),
            ..Default::default()
        };

        for position in positions {
            let record = PositionRecord::observed(&self.line_id, position, observed_at);
            if self.store.record_exists(&record.dedup_key()).await? {
                outcome.duplicates += 1;
                continue;
            }
            self.store.append_record(&record).await?;
            outcome.inserted += 1;
        }

        Ok(outcome)
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Cancellation is honoured while fetching and while sleeping; a batch
    /// that is already being stored is finished first.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(line = %self.line_id, interval_ms = self.interval.as_millis() as u64, "Poller started");

        loop {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                fetched = self.fetch() => fetched,
            };

            match self.complete(fetched).await {
                Ok(outcome) => {
                    tracing::debug!(
                        line = %self.line_id,
                        fetched = outcome.fetched,
                        inserted = outcome.inserted,
                        duplicates = outcome.duplicates,
                        "Poll iteration complete"
                    );
                }
                Err(e) => self.record_failure(&e).await,
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(line = %self.line_id, "Poller stopped");
    }

    async fn record_failure(&self, error: &anyhow::Error) {
        tracing::warn!(line = %self.line_id, error = %format!("{:#}", error), "Poll iteration failed");

        let message = format!(
            "Error tracking positions for linea {}: {:#}",
            self.line_id, error
        );
        if let Err(e) = self.store.append_error(&message).await {
            tracing::error!(line = %self.line_id, error = %e, "Failed to record poller error");
        }
    }
}
