// TestDependencies - mock implementations for testing
//
// Provides a scripted upstream and an in-memory store that can be injected
// into ServerDeps for tests.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Map;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use transit_client::{Line, Position};

use super::{BasePositionStore, BaseTransitApi, ServerDeps};
use crate::common::{
    DedupKey, ErrorRecord, PartitionInfo, PositionRecord, RecordOrder, RecordScope,
};

/// Build an upstream position with no extra fields
pub fn position(unidad: &str, lat: &str, lon: &str, hora: &str) -> Position {
    Position {
        unidad: unidad.to_string(),
        lat: lat.to_string(),
        lon: lon.to_string(),
        hora: hora.to_string(),
        extra: Map::new(),
    }
}

/// Build an upstream line with no extra fields
pub fn line(id: &str) -> Line {
    Line {
        id: id.to_string(),
        extra: Map::new(),
    }
}

// =============================================================================
// Mock Transit API
// =============================================================================

#[derive(Debug, Clone)]
enum Scripted {
    Positions(Vec<Position>),
    Failure(String),
}

/// Upstream double with scripted responses per line.
///
/// Responses queued for a line are served in order; the last one keeps being
/// served once the queue is down to it. Lines with nothing scripted return an
/// empty list.
pub struct MockTransitApi {
    lines: Mutex<Result<Vec<Line>, String>>,
    positions: Mutex<HashMap<String, VecDeque<Scripted>>>,
    lines_calls: Mutex<usize>,
    position_calls: Mutex<Vec<String>>,
}

impl MockTransitApi {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Ok(Vec::new())),
            positions: Mutex::new(HashMap::new()),
            lines_calls: Mutex::new(0),
            position_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_lines(self, ids: &[&str]) -> Self {
        *self.lines.lock().unwrap() = Ok(ids.iter().map(|id| line(id)).collect());
        self
    }

    pub fn with_lines_failure(self, message: &str) -> Self {
        *self.lines.lock().unwrap() = Err(message.to_string());
        self
    }

    /// Queue a successful positions response for a line
    pub fn with_positions(self, line_id: &str, positions: Vec<Position>) -> Self {
        self.push(line_id, Scripted::Positions(positions));
        self
    }

    /// Queue a failed positions response for a line
    pub fn with_failure(self, line_id: &str, message: &str) -> Self {
        self.push(line_id, Scripted::Failure(message.to_string()));
        self
    }

    fn push(&self, line_id: &str, response: Scripted) {
        self.positions
            .lock()
            .unwrap()
            .entry(line_id.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn lines_calls(&self) -> usize {
        *self.lines_calls.lock().unwrap()
    }

    /// Line ids passed to `fetch_positions`, in call order
    pub fn position_calls(&self) -> Vec<String> {
        self.position_calls.lock().unwrap().clone()
    }

    pub fn position_calls_for(&self, line_id: &str) -> usize {
        self.position_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == line_id)
            .count()
    }
}

impl Default for MockTransitApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTransitApi for MockTransitApi {
    async fn fetch_lines(&self) -> Result<Vec<Line>> {
        *self.lines_calls.lock().unwrap() += 1;
        self.lines.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }

    async fn fetch_positions(&self, line_id: &str) -> Result<Vec<Position>> {
        self.position_calls.lock().unwrap().push(line_id.to_string());

        let mut scripts = self.positions.lock().unwrap();
        let response = match scripts.get_mut(line_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match response {
            Some(Scripted::Positions(positions)) => Ok(positions),
            Some(Scripted::Failure(message)) => Err(anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// In-memory Position Store
// =============================================================================

/// Store double backed by vectors.
///
/// Appends can be made to fail after a number of successful writes, and reads
/// can be made to fail outright, to exercise the error paths.
pub struct InMemoryPositionStore {
    records: Mutex<Vec<PositionRecord>>,
    errors: Mutex<Vec<ErrorRecord>>,
    append_limit: Mutex<Option<usize>>,
    failing_reads: Mutex<bool>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            append_limit: Mutex::new(None),
            failing_reads: Mutex::new(false),
        }
    }

    /// Let `limit` appends succeed, then fail every later one
    pub fn with_append_limit(self, limit: usize) -> Self {
        *self.append_limit.lock().unwrap() = Some(limit);
        self
    }

    pub fn with_failing_reads(self) -> Self {
        *self.failing_reads.lock().unwrap() = true;
        self
    }

    pub fn records(&self) -> Vec<PositionRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.lock().unwrap().clone()
    }

    fn check_reads(&self) -> Result<()> {
        if *self.failing_reads.lock().unwrap() {
            bail!("storage unavailable");
        }
        Ok(())
    }

    fn matching(&self, scope: RecordScope) -> Vec<PositionRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| match scope {
                RecordScope::All => true,
                RecordScope::Day(date) => r.service_date == date,
            })
            .cloned()
            .collect()
    }
}

impl Default for InMemoryPositionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePositionStore for InMemoryPositionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn record_exists(&self, key: &DedupKey) -> Result<bool> {
        self.check_reads()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| &r.dedup_key() == key))
    }

    async fn append_record(&self, record: &PositionRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(limit) = *self.append_limit.lock().unwrap() {
            if records.len() >= limit {
                bail!("disk full");
            }
        }
        records.push(record.clone());
        Ok(())
    }

    async fn append_error(&self, message: &str) -> Result<()> {
        self.errors.lock().unwrap().push(ErrorRecord::new(message));
        Ok(())
    }

    async fn count_records(&self, scope: RecordScope) -> Result<u64> {
        self.check_reads()?;
        Ok(self.matching(scope).len() as u64)
    }

    async fn list_records(
        &self,
        scope: RecordScope,
        limit: usize,
        order: RecordOrder,
    ) -> Result<Vec<PositionRecord>> {
        self.check_reads()?;
        let mut records = self.matching(scope);
        if order == RecordOrder::NewestFirst {
            records.reverse();
        }
        records.truncate(limit);
        Ok(records)
    }

    async fn count_errors(&self) -> Result<u64> {
        self.check_reads()?;
        Ok(self.errors.lock().unwrap().len() as u64)
    }

    async fn list_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>> {
        self.check_reads()?;
        Ok(self
            .errors
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn inventory(&self) -> Result<Vec<PartitionInfo>> {
        self.check_reads()?;
        let mut by_day: BTreeMap<_, Vec<PositionRecord>> = BTreeMap::new();
        for record in self.records.lock().unwrap().iter() {
            by_day.entry(record.service_date).or_default().push(record.clone());
        }

        Ok(by_day
            .into_iter()
            .map(|(day, records)| PartitionInfo {
                partition: day.to_string(),
                row_count: records.len() as u64,
                size_bytes: None,
                first_entry_time: records.first().map(|r| r.observation_time.clone()),
                last_entry_time: records.last().map(|r| r.observation_time.clone()),
            })
            .collect())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mocks wired together, with handles kept for assertions
pub struct TestDependencies {
    pub store: Arc<InMemoryPositionStore>,
    pub transit: Arc<MockTransitApi>,
}

impl TestDependencies {
    pub fn new(store: InMemoryPositionStore, transit: MockTransitApi) -> Self {
        Self {
            store: Arc::new(store),
            transit: Arc::new(transit),
        }
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(self.store.clone(), self.transit.clone())
    }
}
