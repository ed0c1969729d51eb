//! File-backed position store.
//!
//! Layout:
//! - `<csv_dir>/<YYYY-MM-DD>.csv`: one file per day, `;`-delimited, header
//!   `linea;unidad;lat;lon;hora` written when the file is created
//! - `<error_log_path>`: one `[<ISO timestamp>] <message>` line per error
//!
//! All writes go through one async lock so rows are never interleaved; reads
//! share the lock and never see a half-written row.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::RwLock;

use crate::common::{
    DedupKey, ErrorRecord, PartitionInfo, PositionRecord, RecordOrder, RecordScope,
};
use crate::kernel::BasePositionStore;

const HEADER: &str = "linea;unidad;lat;lon;hora\n";
const DELIMITER: u8 = b';';
const DAY_FILE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CsvRow {
    linea: String,
    unidad: String,
    lat: String,
    lon: String,
    hora: String,
}

impl CsvRow {
    fn from_record(record: &PositionRecord) -> Self {
        Self {
            linea: record.line_id.clone(),
            unidad: record.unit_id.clone(),
            lat: record.latitude.clone(),
            lon: record.longitude.clone(),
            hora: record.observation_time.clone(),
        }
    }

    fn into_record(self, service_date: NaiveDate) -> PositionRecord {
        PositionRecord {
            service_date,
            line_id: self.linea,
            unit_id: self.unidad,
            latitude: self.lat,
            longitude: self.lon,
            observation_time: self.hora,
            recorded_at: None,
        }
    }

    fn matches(&self, key: &DedupKey) -> bool {
        self.linea == key.line_id && self.unidad == key.unit_id && self.hora == key.observation_time
    }
}

pub struct CsvPositionStore {
    csv_dir: PathBuf,
    error_log_path: PathBuf,
    lock: RwLock<()>,
}

impl CsvPositionStore {
    /// Open the store, creating the data directory and the error log's
    /// parent directory if needed.
    pub async fn open(csv_dir: impl Into<PathBuf>, error_log_path: impl Into<PathBuf>) -> Result<Self> {
        let csv_dir = csv_dir.into();
        let error_log_path = error_log_path.into();

        fs::create_dir_all(&csv_dir)
            .await
            .with_context(|| format!("Failed to create CSV directory {}", csv_dir.display()))?;
        if let Some(parent) = error_log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        Ok(Self {
            csv_dir,
            error_log_path,
            lock: RwLock::new(()),
        })
    }

    pub fn csv_dir(&self) -> &Path {
        &self.csv_dir
    }

    pub fn error_log_path(&self) -> &Path {
        &self.error_log_path
    }

    /// Path of the file holding the records of `date`
    pub fn day_file(&self, date: NaiveDate) -> PathBuf {
        self.csv_dir
            .join(format!("{}.csv", date.format(DAY_FILE_FORMAT)))
    }

    /// Every `*.csv` file in the data directory, sorted by name.
    /// A missing directory has no files.
    async fn csv_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = match fs::read_dir(&self.csv_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to list CSV directory {}", self.csv_dir.display())
                })
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".csv") && entry.file_type().await?.is_file() {
                files.push((name, entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Day files whose name is a date, oldest first
    async fn day_files(&self) -> Result<Vec<(NaiveDate, PathBuf)>> {
        Ok(self
            .csv_files()
            .await?
            .into_iter()
            .filter_map(|(name, path)| {
                let stem = name.strip_suffix(".csv")?;
                let date = NaiveDate::parse_from_str(stem, DAY_FILE_FORMAT).ok()?;
                Some((date, path))
            })
            .collect())
    }

    async fn read_error_log(&self) -> Result<String> {
        match fs::read_to_string(&self.error_log_path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read error log {}", self.error_log_path.display())
            }),
        }
    }
}

/// Raw contents of a day file; a missing file reads as empty
async fn read_day_file(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

async fn read_rows(path: &Path) -> Result<Vec<CsvRow>> {
    let bytes = read_day_file(path).await?;
    parse_rows(&bytes).with_context(|| format!("Malformed CSV file {}", path.display()))
}

/// Like [`read_rows`], but rows that do not parse are skipped with a
/// warning. Used for dedup so one damaged row does not stop polling.
async fn read_rows_skipping_damaged(path: &Path) -> Result<Vec<CsvRow>> {
    let bytes = read_day_file(path).await?;

    Ok(csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes.as_slice())
        .deserialize::<CsvRow>()
        .filter_map(|row| match row {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Skipping damaged CSV row");
                None
            }
        })
        .collect())
}

/// Whether a non-empty file is missing its final newline (a torn write)
async fn lacks_trailing_newline(file: &mut fs::File) -> Result<bool> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

fn parse_rows(bytes: &[u8]) -> Result<Vec<CsvRow>, csv::Error> {
    csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(bytes)
        .deserialize()
        .collect()
}

fn encode_row(row: &CsvRow) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.serialize(row)?;
    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to encode CSV row: {}", e.error()))
}

#[async_trait]
impl BasePositionStore for CsvPositionStore {
    fn backend_name(&self) -> &'static str {
        "csv"
    }

    async fn record_exists(&self, key: &DedupKey) -> Result<bool> {
        let _guard = self.lock.read().await;
        let rows = read_rows_skipping_damaged(&self.day_file(key.service_date)).await?;
        Ok(rows.iter().any(|row| row.matches(key)))
    }

    async fn append_record(&self, record: &PositionRecord) -> Result<()> {
        let line = encode_row(&CsvRow::from_record(record))?;
        let path = self.day_file(record.service_date);

        let _guard = self.lock.write().await;
        let mut file = match OpenOptions::new().append(true).create_new(true).open(&path).await {
            Ok(mut file) => {
                file.write_all(HEADER.as_bytes())
                    .await
                    .with_context(|| format!("Failed to write header to {}", path.display()))?;
                file
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let mut file = OpenOptions::new()
                    .read(true)
                    .append(true)
                    .open(&path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                // Start on a fresh line after a torn row
                if lacks_trailing_newline(&mut file).await? {
                    tracing::warn!(file = %path.display(), "Day file ends mid-row");
                    file.write_all(b"\n").await?;
                }
                file
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()))
            }
        };

        file.write_all(&line)
            .await
            .with_context(|| format!("Failed to append to {}", path.display()))?;
        file.flush().await?;
        Ok(())
    }

    async fn append_error(&self, message: &str) -> Result<()> {
        let line = format!("{}\n", ErrorRecord::new(message).to_log_line());

        let _guard = self.lock.write().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.error_log_path)
            .await
            .with_context(|| format!("Failed to open error log {}", self.error_log_path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn count_records(&self, scope: RecordScope) -> Result<u64> {
        let _guard = self.lock.read().await;
        let paths = match scope {
            RecordScope::Day(date) => vec![self.day_file(date)],
            RecordScope::All => self.day_files().await?.into_iter().map(|(_, p)| p).collect(),
        };

        let mut total = 0u64;
        for path in paths {
            total += read_rows(&path).await?.len() as u64;
        }
        Ok(total)
    }

    async fn list_records(
        &self,
        scope: RecordScope,
        limit: usize,
        order: RecordOrder,
    ) -> Result<Vec<PositionRecord>> {
        let _guard = self.lock.read().await;
        let mut files = match scope {
            RecordScope::Day(date) => vec![(date, self.day_file(date))],
            RecordScope::All => self.day_files().await?,
        };
        if order == RecordOrder::NewestFirst {
            files.reverse();
        }

        let mut records = Vec::new();
        for (date, path) in files {
            if records.len() >= limit {
                break;
            }
            let mut rows = read_rows(&path).await?;
            if order == RecordOrder::NewestFirst {
                rows.reverse();
            }
            let remaining = limit - records.len();
            records.extend(rows.into_iter().take(remaining).map(|r| r.into_record(date)));
        }
        Ok(records)
    }

    async fn count_errors(&self) -> Result<u64> {
        let _guard = self.lock.read().await;
        let log = self.read_error_log().await?;
        Ok(log.lines().filter(|l| !l.trim().is_empty()).count() as u64)
    }

    async fn list_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>> {
        let _guard = self.lock.read().await;
        let log = self.read_error_log().await?;

        Ok(log
            .lines()
            .rev()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| {
                let parsed = ErrorRecord::parse_log_line(l);
                if parsed.is_none() {
                    tracing::warn!(line = %l, "Skipping unparseable error log line");
                }
                parsed
            })
            .take(limit)
            .collect())
    }

    async fn inventory(&self) -> Result<Vec<PartitionInfo>> {
        let _guard = self.lock.read().await;

        let mut partitions = Vec::new();
        for (date, path) in self.day_files().await? {
            let size = fs::metadata(&path)
                .await
                .with_context(|| format!("Failed to stat {}", path.display()))?
                .len();
            let rows = read_rows(&path).await?;

            partitions.push(PartitionInfo {
                partition: format!("{}.csv", date.format(DAY_FILE_FORMAT)),
                row_count: rows.len() as u64,
                size_bytes: Some(size),
                first_entry_time: rows.first().map(|r| r.hora.clone()),
                last_entry_time: rows.last().map(|r| r.hora.clone()),
            });
        }
        Ok(partitions)
    }
}
