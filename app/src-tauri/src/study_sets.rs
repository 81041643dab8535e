//! FILENAME: app/src-tauri/src/study_sets.rs
// PURPOSE: Study set commands over the persistence store.

use persistence::StudySet;
use tauri::State;

use crate::{log_debug, AppState};

#[tauri::command]
pub fn get_study_sets(state: State<AppState>) -> Result<Vec<StudySet>, String> {
    state.store.sets().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_study_set(state: State<AppState>, id: String) -> Result<StudySet, String> {
    state.store.set(&id).map_err(|e| e.to_string())
}

/// Overwrites the set's file wholesale; a set without an id is silently
/// ignored. The empty Ok is the UI's ack.
#[tauri::command]
pub fn store_study_set(state: State<AppState>, set: StudySet) -> Result<(), String> {
    log_debug!("SETS", "storing study set: {:?}", set.id);
    state.store.store_set(&set).map_err(|e| e.to_string())
}
