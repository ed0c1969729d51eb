// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no polling or reporting logic.
// The poller and the HTTP handlers are written against these so tests can
// swap in the mocks from `test_dependencies`.
//
// Naming convention: Base* for trait names (e.g., BasePositionStore)

use anyhow::Result;
use async_trait::async_trait;
use transit_client::{Line, Position};

use crate::common::{DedupKey, ErrorRecord, PartitionInfo, PositionRecord, RecordOrder, RecordScope};

// =============================================================================
// Position Store Trait (Infrastructure - persistence backends)
// =============================================================================

/// Persistence for observed positions and captured errors.
///
/// Implementations must tolerate concurrent calls from every poller plus the
/// HTTP handlers. A single `append_record` must never leave a partially
/// written record behind.
#[async_trait]
pub trait BasePositionStore: Send + Sync {
    /// Short backend name reported by `/status` ("csv", "postgres", ...)
    fn backend_name(&self) -> &'static str;

    /// Whether a record with this dedup key is already stored
    async fn record_exists(&self, key: &DedupKey) -> Result<bool>;

    /// Persist one position record
    async fn append_record(&self, record: &PositionRecord) -> Result<()>;

    /// Persist one error record, timestamped now
    async fn append_error(&self, message: &str) -> Result<()>;

    async fn count_records(&self, scope: RecordScope) -> Result<u64>;

    async fn list_records(
        &self,
        scope: RecordScope,
        limit: usize,
        order: RecordOrder,
    ) -> Result<Vec<PositionRecord>>;

    async fn count_errors(&self) -> Result<u64>;

    /// Most recent errors first
    async fn list_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>>;

    /// One entry per day partition, oldest partition first
    async fn inventory(&self) -> Result<Vec<PartitionInfo>>;
}

// =============================================================================
// Transit API Trait (Infrastructure - upstream operator)
// =============================================================================

#[async_trait]
pub trait BaseTransitApi: Send + Sync {
    /// All lines currently published by the operator
    async fn fetch_lines(&self) -> Result<Vec<Line>>;

    /// Live positions of the units on one line
    async fn fetch_positions(&self, line_id: &str) -> Result<Vec<Position>>;
}
