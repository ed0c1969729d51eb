// Record types shared by the storage backends, the pollers and the HTTP layer.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use transit_client::Position;

/// Format of the `datetime` field exposed for stored positions
pub const RECORDED_AT_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Identity of an observation for deduplication.
///
/// Two observations of the same unit on the same line at the same reported
/// time on the same day are the same observation, even if the coordinates
/// differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub service_date: NaiveDate,
    pub line_id: String,
    pub unit_id: String,
    pub observation_time: String,
}

/// A bus position as persisted by the tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionRecord {
    /// Local date the position was observed on (the day partition)
    #[serde(rename = "date")]
    pub service_date: NaiveDate,
    #[serde(rename = "linea")]
    pub line_id: String,
    #[serde(rename = "unidad")]
    pub unit_id: String,
    #[serde(rename = "lat")]
    pub latitude: String,
    #[serde(rename = "lon")]
    pub longitude: String,
    /// Time of day as reported by the operator
    #[serde(rename = "hora")]
    pub observation_time: String,
    /// When the tracker stored the record. Not kept by the CSV backend.
    #[serde(rename = "datetime", serialize_with = "serialize_recorded_at")]
    pub recorded_at: Option<NaiveDateTime>,
}

impl PositionRecord {
    /// Build the record for a position fetched for `line_id` at `observed_at`.
    pub fn observed(line_id: &str, position: &Position, observed_at: DateTime<Local>) -> Self {
        Self {
            service_date: observed_at.date_naive(),
            line_id: line_id.to_string(),
            unit_id: position.unidad.clone(),
            latitude: position.lat.clone(),
            longitude: position.lon.clone(),
            observation_time: position.hora.clone(),
            recorded_at: Some(observed_at.naive_local()),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            service_date: self.service_date,
            line_id: self.line_id.clone(),
            unit_id: self.unit_id.clone(),
            observation_time: self.observation_time.clone(),
        }
    }
}

fn serialize_recorded_at<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.collect_str(&ts.format(RECORDED_AT_FORMAT)),
        None => serializer.serialize_none(),
    }
}

/// A failure captured while polling, discovering lines or reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// ISO-8601 timestamp with millisecond precision, e.g. `2024-05-01T13:04:05.120Z`
    pub fn iso_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// One-line rendering: `[<timestamp>] <message>`
    pub fn to_log_line(&self) -> String {
        format!("[{}] {}", self.iso_timestamp(), self.message.replace(['\r', '\n'], " "))
    }

    /// Parse a line produced by [`ErrorRecord::to_log_line`].
    pub fn parse_log_line(line: &str) -> Option<Self> {
        let (timestamp, message) = line.trim_end().strip_prefix('[')?.split_once("] ")?;
        let timestamp = DateTime::parse_from_rfc3339(timestamp).ok()?;
        Some(Self {
            message: message.to_string(),
            timestamp: timestamp.with_timezone(&Utc),
        })
    }
}

/// Which records a count or listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    All,
    Day(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrder {
    NewestFirst,
    OldestFirst,
}

/// Summary of one day partition, as reported by `/csv-info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    /// Partition name: the file name for CSV, the date for PostgreSQL
    pub partition: String,
    pub row_count: u64,
    /// On-disk size, when the backend can tell
    pub size_bytes: Option<u64>,
    pub first_entry_time: Option<String>,
    pub last_entry_time: Option<String>,
}
