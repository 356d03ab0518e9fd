use std::fs;

use pretty_assertions::assert_eq;
use routewatch_core::{JobDescriptor, JobStatus, ProcessingOptions, FRESHNESS_WINDOW_MS};
use routewatch_engine::{fixed_clock, FileJobStore, JobStore, MemoryJobStore, STATE_FILENAME};
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000_000;

fn descriptor() -> JobDescriptor {
    let mut descriptor = JobDescriptor::new("bulk_1_1", ProcessingOptions::default(), 5);
    descriptor.progress.status = JobStatus::Processing;
    descriptor.progress.total_routes = 10;
    descriptor.progress.completed_routes = 3;
    descriptor
}

#[test]
fn save_then_load_round_trips_and_stamps_time() {
    let temp = TempDir::new().unwrap();
    let store = FileJobStore::new(temp.path().to_path_buf()).with_clock(fixed_clock(NOW));

    store.save(&descriptor()).unwrap();
    let loaded = store.load().expect("fresh descriptor");

    assert_eq!(
        loaded,
        JobDescriptor {
            timestamp_ms: NOW,
            ..descriptor()
        }
    );
    assert!(temp.path().join(STATE_FILENAME).is_file());
}

#[test]
fn stored_file_uses_camel_case_keys() {
    let temp = TempDir::new().unwrap();
    let store = FileJobStore::new(temp.path().to_path_buf()).with_clock(fixed_clock(NOW));
    store.save(&descriptor()).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["processingId"], "bulk_1_1");
    assert_eq!(raw["timestamp"], NOW);
    assert_eq!(raw["progress"]["completedRoutes"], 3);
}

#[test]
fn expired_state_is_discarded_on_load() {
    let temp = TempDir::new().unwrap();
    FileJobStore::new(temp.path().to_path_buf())
        .with_clock(fixed_clock(NOW))
        .save(&descriptor())
        .unwrap();

    let almost = FileJobStore::new(temp.path().to_path_buf())
        .with_clock(fixed_clock(NOW + FRESHNESS_WINDOW_MS - 1));
    assert!(almost.load().is_some());

    let later = FileJobStore::new(temp.path().to_path_buf())
        .with_clock(fixed_clock(NOW + FRESHNESS_WINDOW_MS));
    assert_eq!(later.load(), None);
    assert!(!later.path().exists());
}

#[test]
fn custom_freshness_window_applies() {
    let temp = TempDir::new().unwrap();
    FileJobStore::new(temp.path().to_path_buf())
        .with_clock(fixed_clock(NOW))
        .save(&descriptor())
        .unwrap();

    let store = FileJobStore::new(temp.path().to_path_buf())
        .with_clock(fixed_clock(NOW + 1_000))
        .with_freshness_window(1_000);
    assert_eq!(store.load(), None);
}

#[test]
fn corrupted_state_reads_as_absent_and_is_removed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(STATE_FILENAME);
    fs::write(&path, "{ not json").unwrap();

    let store = FileJobStore::new(temp.path().to_path_buf()).with_clock(fixed_clock(NOW));
    assert_eq!(store.load(), None);
    assert!(!path.exists());
}

#[test]
fn missing_state_reads_as_absent() {
    let temp = TempDir::new().unwrap();
    let store = FileJobStore::new(temp.path().join("never-created"));
    assert_eq!(store.load(), None);
}

#[test]
fn clear_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let store = FileJobStore::new(temp.path().to_path_buf()).with_clock(fixed_clock(NOW));
    store.save(&descriptor()).unwrap();

    store.clear().unwrap();
    store.clear().unwrap();
    assert_eq!(store.load(), None);
}

#[test]
fn save_overwrites_the_single_slot() {
    let temp = TempDir::new().unwrap();
    let store = FileJobStore::new(temp.path().to_path_buf()).with_clock(fixed_clock(NOW));
    store.save(&descriptor()).unwrap();

    let mut next = descriptor();
    next.processing_id = "bulk_2_2".to_string();
    store.save(&next).unwrap();

    assert_eq!(store.load().unwrap().processing_id, "bulk_2_2");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn memory_store_follows_the_same_rules() {
    let store = MemoryJobStore::new(fixed_clock(NOW));
    assert!(store.is_empty());

    store.save(&descriptor()).unwrap();
    assert_eq!(store.load().unwrap().timestamp_ms, NOW);

    store.put_raw("garbage");
    assert_eq!(store.load(), None);

    store.clear().unwrap();
    assert!(store.is_empty());
}
