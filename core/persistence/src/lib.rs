//! FILENAME: core/persistence/src/lib.rs
//! SignBench Persistence Module
//!
//! Reads and writes the small JSON documents the dashboard keeps on disk:
//! the settings document and one file per study set.

mod error;

pub use error::StoreError;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

// ============================================================================
// DOCUMENTS
// ============================================================================

/// The settings document is opaque to the backend: it is whatever JSON the
/// UI stored, returned verbatim. Unknown fields round-trip untouched.
pub type AppSettings = Value;

/// Settings written on first run, before the UI has stored anything.
pub fn default_settings() -> AppSettings {
    json!({})
}

/// A named, identified collection of flashcard items, stored one per file.
///
/// A set without an id has never been persisted; `Store::store_set` leaves
/// it alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub items: Vec<StudySetItem>,
}

/// A single flashcard: the image to show and the help text behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySetItem {
    pub image: String,
    pub help: String,
}

// ============================================================================
// STORE
// ============================================================================

/// Owns the fixed on-disk layout under one base directory:
/// `<base>/config.json` and `<base>/sets/<id>.json`.
pub struct Store {
    config_path: PathBuf,
    sets_dir: PathBuf,
}

impl Store {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            config_path: base.join("config.json"),
            sets_dir: base.join("sets"),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn sets_dir(&self) -> &Path {
        &self.sets_dir
    }

    /// Read the settings document, creating it with defaults on first miss.
    /// Read failures other than not-found propagate unchanged.
    pub fn load_settings(&self) -> Result<AppSettings, StoreError> {
        match fs::read(&self.config_path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let settings = default_settings();
                write_json(&self.config_path, &settings)?;
                Ok(settings)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List every stored study set. No ordering guarantee; any single
    /// unreadable or malformed file aborts the whole call.
    pub fn sets(&self) -> Result<Vec<StudySet>, StoreError> {
        let mut sets = Vec::new();
        for entry in fs::read_dir(&self.sets_dir)? {
            let bytes = fs::read(entry?.path())?;
            sets.push(serde_json::from_slice(&bytes)?);
        }
        Ok(sets)
    }

    /// Fetch one study set by id. A missing file is `SetNotFound` carrying
    /// the requested id; other I/O failures propagate unchanged.
    pub fn set(&self, id: &str) -> Result<StudySet, StoreError> {
        match fs::read(self.set_path(id)) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::SetNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the file for this set's id wholesale. A set without an id
    /// is silently left unwritten.
    pub fn store_set(&self, set: &StudySet) -> Result<(), StoreError> {
        let Some(id) = &set.id else {
            return Ok(());
        };
        write_json(&self.set_path(id), set)
    }

    fn set_path(&self, id: &str) -> PathBuf {
        self.sets_dir.join(format!("{id}.json"))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec(value)?)?;
    Ok(())
}
