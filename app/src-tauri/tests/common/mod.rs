//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for SignBench backend integration tests.

use app_lib::{AppState, StudySet, StudySetItem};
use tempfile::TempDir;

/// Test harness wrapping an `AppState` rooted in a temp directory.
pub struct TestHarness {
    pub state: AppState,
    // Held so the directory outlives the test body.
    _dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        TestHarness {
            state: AppState::new(dir.path()),
            _dir: dir,
        }
    }
}

#[allow(dead_code)]
pub fn sample_set(id: Option<&str>, name: &str) -> StudySet {
    StudySet {
        id: id.map(str::to_string),
        name: name.to_string(),
        items: vec![
            StudySetItem {
                image: "letter-a.png".to_string(),
                help: "closed fist, thumb alongside".to_string(),
            },
            StudySetItem {
                image: "letter-b.png".to_string(),
                help: "flat hand, thumb across the palm".to_string(),
            },
        ],
    }
}
