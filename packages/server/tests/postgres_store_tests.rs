//! PostgreSQL backend tests. Need Docker: `cargo test -- --ignored`.

mod common;

use chrono::{Local, NaiveDate, TimeZone};
use tracker_core::common::{PositionRecord, RecordOrder, RecordScope};
use tracker_core::kernel::test_dependencies::position;
use tracker_core::kernel::BasePositionStore;

use crate::common::PostgresHarness;

fn record(line: &str, unidad: &str, lat: &str, hora: &str, day: u32) -> PositionRecord {
    let at = Local.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap();
    PositionRecord::observed(line, &position(unidad, lat, "-57.6", hora), at)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_dedup_key_lookup_and_conflict() {
    let harness = PostgresHarness::new().await.unwrap();
    let store = &harness.store;
    let stored = record("1", "7", "-25.3", "10:00:00", 1);

    store.append_record(&stored).await.unwrap();

    let jittered = record("1", "7", "-25.4", "10:00:00", 1);
    assert!(store.record_exists(&jittered.dedup_key()).await.unwrap());
    assert!(!store
        .record_exists(&record("1", "7", "-25.3", "10:00:00", 2).dedup_key())
        .await
        .unwrap());

    // A racing insert of the same key is dropped by the unique constraint
    store.append_record(&jittered).await.unwrap();
    assert_eq!(store.count_records(RecordScope::All).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_counts_and_listing() {
    let harness = PostgresHarness::new().await.unwrap();
    let store = &harness.store;
    store.append_record(&record("1", "7", "-25.3", "09:00:00", 1)).await.unwrap();
    store.append_record(&record("1", "8", "-25.3", "09:30:00", 1)).await.unwrap();
    store.append_record(&record("2", "3", "-25.1", "11:00:00", 2)).await.unwrap();

    let may_1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    assert_eq!(store.count_records(RecordScope::All).await.unwrap(), 3);
    assert_eq!(store.count_records(RecordScope::Day(may_1)).await.unwrap(), 2);

    let newest = store
        .list_records(RecordScope::All, 2, RecordOrder::NewestFirst)
        .await
        .unwrap();
    let times: Vec<_> = newest.iter().map(|r| r.observation_time.as_str()).collect();
    assert_eq!(times, vec!["11:00:00", "09:30:00"]);
    assert_eq!(
        newest[0].recorded_at.map(|ts| ts.format("%d-%m-%Y %H:%M:%S").to_string()),
        Some("02-05-2024 12:00:00".to_string())
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_inventory_per_service_date() {
    let harness = PostgresHarness::new().await.unwrap();
    let store = &harness.store;
    store.append_record(&record("1", "7", "-25.3", "09:00:00", 1)).await.unwrap();
    store.append_record(&record("1", "8", "-25.3", "09:30:00", 1)).await.unwrap();
    store.append_record(&record("2", "3", "-25.1", "11:00:00", 2)).await.unwrap();

    let inventory = store.inventory().await.unwrap();

    assert_eq!(inventory.len(), 2);
    assert_eq!(inventory[0].partition, "2024-05-01");
    assert_eq!(inventory[0].row_count, 2);
    assert_eq!(inventory[0].size_bytes, None);
    assert_eq!(inventory[0].first_entry_time.as_deref(), Some("09:00:00"));
    assert_eq!(inventory[0].last_entry_time.as_deref(), Some("09:30:00"));
    assert_eq!(inventory[1].partition, "2024-05-02");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_errors_newest_first() {
    let harness = PostgresHarness::new().await.unwrap();
    let store = &harness.store;

    assert_eq!(store.count_errors().await.unwrap(), 0);
    store.append_error("Error fetching bus lines: timed out").await.unwrap();
    store.append_error("Error tracking positions for linea 3: reset").await.unwrap();

    assert_eq!(store.count_errors().await.unwrap(), 2);
    let errors = store.list_errors(10).await.unwrap();
    assert_eq!(errors[0].message, "Error tracking positions for linea 3: reset");
    assert_eq!(errors[1].message, "Error fetching bus lines: timed out");
}
