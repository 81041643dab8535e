//! FILENAME: tests/test_settings.rs
//! Integration tests for the settings document (load-or-create).

mod common;

use common::TestHarness;

#[test]
fn test_first_load_creates_the_config_file() {
    let harness = TestHarness::new();
    let store = &harness.state.store;

    assert!(!store.config_path().exists());
    let settings = store.load_settings().unwrap();

    assert!(store.config_path().exists());
    assert_eq!(settings, persistence::default_settings());
}

#[test]
fn test_second_load_returns_the_same_document() {
    let harness = TestHarness::new();
    let store = &harness.state.store;

    let first = store.load_settings().unwrap();
    let second = store.load_settings().unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_existing_file_round_trips_exactly() {
    let harness = TestHarness::new();
    let store = &harness.state.store;

    let document = serde_json::json!({
        "theme": "dark",
        "recentSets": ["a", "b"],
        "somethingTheBackendNeverHeardOf": { "kept": true }
    });
    std::fs::create_dir_all(store.config_path().parent().unwrap()).unwrap();
    std::fs::write(
        store.config_path(),
        serde_json::to_vec(&document).unwrap(),
    )
    .unwrap();

    assert_eq!(store.load_settings().unwrap(), document);
}
