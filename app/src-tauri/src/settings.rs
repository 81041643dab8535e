//! FILENAME: app/src-tauri/src/settings.rs
// PURPOSE: Settings document command (load-or-create on first run).

use persistence::AppSettings;
use tauri::State;

use crate::{log_debug, AppState};

#[tauri::command]
pub fn get_settings(state: State<AppState>) -> Result<AppSettings, String> {
    let settings = state.store.load_settings().map_err(|e| e.to_string())?;
    log_debug!("CFG", "loaded settings: {}", settings);
    Ok(settings)
}
