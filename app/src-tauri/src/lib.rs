//! FILENAME: app/src-tauri/src/lib.rs
// PURPOSE: Main library entry point (Tauri bridge between the webview UI,
// the study-set store and the robot telemetry client).

use std::path::PathBuf;
use std::time::Duration;

use tauri::Manager;

pub mod logging;

pub mod api_types;
pub mod settings;
pub mod study_sets;
pub mod telemetry;

pub use api_types::TelemetryUpdate;
pub use persistence::{AppSettings, Store, StoreError, StudySet, StudySetItem};
pub use telemetry::TelemetryBridge;


/// Everything lives under `~/.signbench`: settings, sets, the unified log.
pub const APP_DIR_NAME: &str = ".signbench";

/// Where `--serve` points the webview during development.
pub const DEV_SERVER_URL: &str = "http://localhost:4200";

/// Fixed delay between telemetry reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_millis(1000);

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// The one owned session object: the document store and the telemetry
/// bridge, managed by Tauri and handed to every command.
pub struct AppState {
    pub store: Store,
    pub telemetry: TelemetryBridge,
}

impl AppState {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            store: Store::new(base),
            telemetry: TelemetryBridge::new(RECONNECT_DELAY),
        }
    }
}

/// Application data directory (`~/.signbench`).
pub fn app_dir() -> Result<PathBuf, String> {
    dirs::home_dir()
        .map(|home| home.join(APP_DIR_NAME))
        .ok_or_else(|| "no home directory".to_string())
}

pub fn create_app_state() -> Result<AppState, String> {
    Ok(AppState::new(app_dir()?))
}

// ============================================================================
// TAURI APP ENTRY
// ============================================================================

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    match app_dir().and_then(|dir| logging::init_log_file(&dir)) {
        Ok(path) => {
            log_info!("SYS", "backend starting, log={}", path.display());
        }
        Err(e) => {
            eprintln!("[LOG_INIT] FAILED: {}", e);
            eprintln!("[LOG_INIT] Continuing with console-only logging");
        }
    }
    logging::install_facade_bridge();

    let serve = std::env::args().any(|arg| arg == "--serve");
    let state = match create_app_state() {
        Ok(state) => state,
        Err(e) => {
            log_error!("SYS", "cannot resolve application directory: {}", e);
            std::process::exit(1);
        }
    };

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            // Settings commands
            settings::get_settings,
            // Study set commands
            study_sets::get_study_sets,
            study_sets::get_study_set,
            study_sets::store_study_set,
            // Telemetry commands
            telemetry::connect,
            telemetry::put,
            // Logging commands
            logging::log_frontend_atomic,
            logging::get_next_seq,
        ])
        .setup(move |app| {
            if let Some(window) = app.get_webview_window("main") {
                if serve {
                    // Point the webview at the live dev server instead of
                    // the packaged bundle.
                    log_info!("SYS", "serving UI from {}", DEV_SERVER_URL);
                    window.eval(&format!("window.location.replace('{}')", DEV_SERVER_URL))?;
                }
                #[cfg(debug_assertions)]
                window.open_devtools();
            }
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app_handle, event| match event {
        // macOS convention: the process outlives its windows and the dock
        // reopen recreates one.
        #[cfg(target_os = "macos")]
        tauri::RunEvent::ExitRequested { code: None, api, .. } => {
            api.prevent_exit();
        }
        #[cfg(target_os = "macos")]
        tauri::RunEvent::Reopen {
            has_visible_windows: false,
            ..
        } => {
            if let Err(e) = tauri::WebviewWindowBuilder::new(
                app_handle,
                "main",
                tauri::WebviewUrl::default(),
            )
            .title("SignBench")
            .maximized(true)
            .build()
            {
                log_error!("SYS", "failed to recreate window: {}", e);
            }
        }
        _ => {
            let _ = app_handle;
        }
    });
}
