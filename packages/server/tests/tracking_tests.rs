//! End-to-end tracking against the CSV backend with a scripted upstream.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracker_core::common::{RecordOrder, RecordScope};
use tracker_core::domains::tracking::{start_tracking, PollOutcome, PositionPoller};
use tracker_core::kernel::test_dependencies::{position, MockTransitApi};
use tracker_core::kernel::{BasePositionStore, ServerDeps};

use crate::common::{temp_csv_store, wait_until};

const INTERVAL: Duration = Duration::from_millis(5);

#[tokio::test]
async fn test_same_position_twice_is_persisted_once() {
    let (store, _dir) = temp_csv_store().await;
    let transit = Arc::new(MockTransitApi::new().with_positions(
        "1",
        vec![position("7", "-25.3", "-57.6", "10:00:00")],
    ));
    let deps = ServerDeps::new(store.clone(), transit.clone());
    let poller = PositionPoller::new("1", &deps, INTERVAL);

    let first = poller.poll_once().await.unwrap();
    let second = poller.poll_once().await.unwrap();

    assert_eq!(first.inserted, 1);
    assert_eq!(second, PollOutcome { fetched: 1, inserted: 0, duplicates: 1 });
    assert_eq!(store.count_records(RecordScope::All).await.unwrap(), 1);

    let contents = std::fs::read_to_string(store.day_file(Local::now().date_naive())).unwrap();
    assert_eq!(contents, "linea;unidad;lat;lon;hora\n1;7;-25.3;-57.6;10:00:00\n");
}

#[tokio::test]
async fn test_damaged_row_in_today_file_does_not_stop_polling() {
    let (store, _dir) = temp_csv_store().await;
    let today = store.day_file(Local::now().date_naive());
    std::fs::write(&today, "linea;unidad;lat;lon;hora\n1;7;-25.3\n").unwrap();
    let transit = Arc::new(MockTransitApi::new().with_positions(
        "2",
        vec![position("4", "-25.2", "-57.5", "10:00:02")],
    ));
    let deps = ServerDeps::new(store.clone(), transit.clone());
    let poller = PositionPoller::new("2", &deps, INTERVAL);

    let first = poller.poll_once().await.unwrap();
    let second = poller.poll_once().await.unwrap();

    assert_eq!(first.inserted, 1);
    assert_eq!(second.duplicates, 1);
    let contents = std::fs::read_to_string(&today).unwrap();
    assert!(contents.ends_with("\n2;4;-25.2;-57.5;10:00:02\n"));
    assert!(store.list_errors(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transport_error_logs_line_and_keeps_count() {
    let (store, _dir) = temp_csv_store().await;
    let transit = Arc::new(MockTransitApi::new().with_failure("3", "error sending request"));
    let deps = ServerDeps::new(store.clone(), transit.clone());
    let before = store.count_records(RecordScope::All).await.unwrap();

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(PositionPoller::new("3", &deps, INTERVAL).run(shutdown.clone()));
    wait_until(|| transit.position_calls_for("3") >= 2).await;
    shutdown.cancel();
    task.await.unwrap();

    assert_eq!(store.count_records(RecordScope::All).await.unwrap(), before);

    let errors = store.list_errors(100).await.unwrap();
    assert!(!errors.is_empty());
    assert!(errors
        .iter()
        .all(|e| e.message == "Error tracking positions for linea 3: error sending request"));

    let log = std::fs::read_to_string(store.error_log_path()).unwrap();
    let first = log.lines().next().unwrap();
    assert!(first.starts_with('['));
    assert!(first.ends_with("] Error tracking positions for linea 3: error sending request"));
}

#[tokio::test]
async fn test_discovery_starts_a_poller_per_line() {
    let (store, _dir) = temp_csv_store().await;
    let transit = Arc::new(
        MockTransitApi::new()
            .with_lines(&["1", "2"])
            .with_positions("1", vec![position("7", "-25.3", "-57.6", "10:00:00")])
            .with_positions("2", vec![position("4", "-25.2", "-57.5", "10:00:02")]),
    );
    let deps = ServerDeps::new(store.clone(), transit.clone());

    let handle = start_tracking(&deps, INTERVAL, CancellationToken::new()).await;
    assert_eq!(handle.poller_count(), 2);

    wait_until(|| transit.position_calls_for("1") >= 1 && transit.position_calls_for("2") >= 1).await;
    handle.shutdown().await;

    let records = store
        .list_records(RecordScope::All, 100, RecordOrder::OldestFirst)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    let mut lines: Vec<_> = records.iter().map(|r| r.line_id.as_str()).collect();
    lines.sort();
    assert_eq!(lines, vec!["1", "2"]);
}

#[tokio::test]
async fn test_failing_line_does_not_stop_healthy_line() {
    let (store, _dir) = temp_csv_store().await;
    let transit = Arc::new(
        MockTransitApi::new()
            .with_lines(&["1", "3"])
            .with_positions("1", vec![position("7", "-25.3", "-57.6", "10:00:00")])
            .with_positions("1", vec![position("7", "-25.3", "-57.6", "10:00:05")])
            .with_positions("1", vec![position("7", "-25.3", "-57.6", "10:00:10")])
            .with_failure("3", "connection reset"),
    );
    let deps = ServerDeps::new(store.clone(), transit.clone());

    let handle = start_tracking(&deps, INTERVAL, CancellationToken::new()).await;
    wait_until(|| transit.position_calls_for("1") >= 4 && transit.position_calls_for("3") >= 4).await;
    handle.shutdown().await;

    let records = store
        .list_records(RecordScope::All, 100, RecordOrder::OldestFirst)
        .await
        .unwrap();
    let times: Vec<_> = records.iter().map(|r| r.observation_time.as_str()).collect();
    assert_eq!(times, vec!["10:00:00", "10:00:05", "10:00:10"]);

    let errors = store.list_errors(1000).await.unwrap();
    assert!(errors.len() >= 3);
    assert!(errors.iter().all(|e| e.message.contains("linea 3")));
}

#[tokio::test]
async fn test_discovery_failure_is_logged_once() {
    let (store, _dir) = temp_csv_store().await;
    let transit = Arc::new(MockTransitApi::new().with_lines_failure("upstream returned 502"));
    let deps = ServerDeps::new(store.clone(), transit.clone());

    let handle = start_tracking(&deps, INTERVAL, CancellationToken::new()).await;

    assert_eq!(handle.poller_count(), 0);
    handle.shutdown().await;

    let errors = store.list_errors(10).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Error fetching bus lines: upstream returned 502");
    assert_eq!(store.count_records(RecordScope::All).await.unwrap(), 0);
}
