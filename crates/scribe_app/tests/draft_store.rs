use pretty_assertions::assert_eq;
use scribe_app::DraftStore;
use scribe_core::DraftSnapshot;
use serde_json::json;

fn init_logging() {
    session_logging::initialize_for_tests();
}

fn sample_draft() -> DraftSnapshot {
    DraftSnapshot {
        current_step: 3,
        completed_steps: vec![1, 2],
        source_url: "https://example.com/characters/1".to_string(),
        parsed_result: Some(json!({"name": "Mira", "stats": {"str": 14}})),
        timestamp_ms: 1_700_000_000_000,
    }
}

#[test]
fn save_then_load_round_trips_exactly() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DraftStore::new(dir.path().to_path_buf());

    assert!(!store.exists());
    store.save(&sample_draft());
    assert!(store.exists());

    let loaded = store.load().expect("draft present");
    assert_eq!(loaded, sample_draft());
}

#[test]
fn the_slot_is_last_write_wins() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DraftStore::new(dir.path().to_path_buf());

    store.save(&sample_draft());
    let mut newer = sample_draft();
    newer.current_step = 5;
    newer.completed_steps = vec![1, 2, 3, 4];
    newer.timestamp_ms += 60_000;
    store.save(&newer);

    assert_eq!(store.load().expect("draft present"), newer);
}

#[test]
fn loading_with_no_file_is_none() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DraftStore::new(dir.path().join("never-created"));
    assert!(store.load().is_none());
    assert!(!store.exists());
}

#[test]
fn a_corrupted_slot_is_treated_as_absent() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DraftStore::new(dir.path().to_path_buf());
    std::fs::write(dir.path().join("draft.ron"), "(not ron at all").expect("write");
    assert!(store.load().is_none());
}

#[test]
fn clear_removes_the_slot() {
    init_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = DraftStore::new(dir.path().to_path_buf());

    store.save(&sample_draft());
    assert!(store.exists());
    store.clear();
    assert!(!store.exists());
    assert!(store.load().is_none());

    // Clearing an already-empty slot is fine.
    store.clear();
}
