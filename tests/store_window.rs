// tests/store_window.rs
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use trends_aggregator::ingest::normalize_batch;
use trends_aggregator::{FixedClock, JsonlSnapshotStore, Observation, RawTrend, SnapshotStore};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap()
}

fn batch(at: DateTime<Utc>, kws: &[&str]) -> Vec<Observation> {
    let raw = kws.iter().map(|k| RawTrend::new(*k, "1万+")).collect();
    normalize_batch(raw, at).0
}

fn setup() -> (tempfile::TempDir, Arc<FixedClock>, JsonlSnapshotStore) {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::new(t0()));
    let store = JsonlSnapshotStore::new(dir.path(), clock.clone());
    (dir, clock, store)
}

#[test]
fn appended_batch_is_fully_visible_once() {
    let (_dir, _clock, store) = setup();
    let obs = batch(t0(), &["alpha", "beta", "alpha"]);
    let handle = store.append(&obs).unwrap();
    assert_eq!(handle.observations, 3);

    let loaded = store.load_window(Duration::hours(1));
    assert_eq!(loaded, obs);
    let ids: HashSet<_> = loaded.iter().map(|o| o.id.clone()).collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn window_start_is_inclusive() {
    let (_dir, _clock, store) = setup();
    let window = Duration::days(7);
    store.append(&batch(t0() - window, &["boundary"])).unwrap();
    store
        .append(&batch(t0() - window - Duration::seconds(1), &["too old"]))
        .unwrap();
    store.append(&batch(t0(), &["now"])).unwrap();

    let kws: HashSet<_> = store
        .load_window(window)
        .into_iter()
        .map(|o| o.keyword)
        .collect();
    assert_eq!(
        kws,
        HashSet::from(["boundary".to_string(), "now".to_string()])
    );
}

#[test]
fn future_units_are_outside_the_window() {
    let (_dir, clock, store) = setup();
    store.append(&batch(t0() + Duration::hours(2), &["later"])).unwrap();
    assert!(store.load_window(Duration::days(1)).is_empty());
    clock.advance(Duration::hours(2));
    assert_eq!(store.load_window(Duration::days(1)).len(), 1);
}

#[test]
fn corrupt_unit_is_skipped_and_the_rest_survive() {
    let (dir, _clock, store) = setup();
    store
        .append(&batch(t0() - Duration::hours(3), &["one", "two"]))
        .unwrap();
    store.append(&batch(t0() - Duration::hours(1), &["three"])).unwrap();

    // truncated mid-line, as after a crash with a naive writer
    let bad = dir.path().join("20260110_103000.jsonl");
    fs::write(&bad, "{\"id\":\"x\",\"timestamp\":\"2026-01-10T11:00:00Z\",\"keyw").unwrap();
    // valid JSON, wrong shape
    fs::write(dir.path().join("20260110_113000.jsonl"), "{\"hello\":1}\n").unwrap();

    let scan = store.scan_window(Duration::days(1));
    assert_eq!(scan.units_read, 2);
    assert_eq!(scan.skipped.len(), 2);
    let kws: Vec<_> = scan.observations.iter().map(|o| o.keyword.as_str()).collect();
    assert_eq!(kws, vec!["one", "two", "three"]);
}

#[test]
fn reads_are_idempotent() {
    let (_dir, _clock, store) = setup();
    store.append(&batch(t0(), &["a", "b"])).unwrap();
    store.append(&batch(t0(), &["c"])).unwrap();
    let first = store.load_window(Duration::days(7));
    let second = store.load_window(Duration::days(7));
    assert_eq!(first, second);
    assert_eq!(store.list_units().unwrap().len(), 2);
}

#[test]
fn legacy_other_label_is_read() {
    let (dir, _clock, store) = setup();
    fs::write(
        dir.path().join("20260110_120000.jsonl"),
        concat!(
            r#"{"id":"1","timestamp":"2026-01-10T12:00:00Z","keyword":"xyz123","traffic_numeric":0,"category":"other","raw_traffic_text":"N/A"}"#,
            "\n"
        ),
    )
    .unwrap();
    let loaded = store.load_window(Duration::hours(1));
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].category, trends_aggregator::Category::Other);
}

#[test]
fn batch_with_foreign_timestamps_is_refused() {
    let (_dir, _clock, store) = setup();
    let mut obs = batch(t0(), &["fresh"]);
    obs.extend(batch(t0() - Duration::days(30), &["ancient"]));

    let err = store.append(&obs).unwrap_err();
    assert!(matches!(err, trends_aggregator::StoreError::MixedBatch { .. }));
    assert!(store.list_units().unwrap().is_empty());
    assert!(store.load_window(Duration::days(7)).is_empty());
}

#[test]
fn rows_outside_the_window_are_dropped_even_inside_a_fresh_unit() {
    let (dir, _clock, store) = setup();
    fs::write(
        dir.path().join("20260110_120000.jsonl"),
        concat!(
            r#"{"id":"1","timestamp":"2026-01-10T12:00:00Z","keyword":"fresh","traffic_numeric":1,"category":"其他","raw_traffic_text":"1"}"#,
            "\n",
            r#"{"id":"2","timestamp":"2025-12-11T12:00:00Z","keyword":"ancient","traffic_numeric":1,"category":"其他","raw_traffic_text":"1"}"#,
            "\n"
        ),
    )
    .unwrap();

    let kws: Vec<_> = store
        .load_window(Duration::days(7))
        .into_iter()
        .map(|o| o.keyword)
        .collect();
    assert_eq!(kws, vec!["fresh".to_string()]);
}
