//! FILENAME: app/src-tauri/src/logging.rs
// PURPOSE: Unified logging system shared by the backend and the webview UI.
// FORMAT: seq|level|category|message

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use once_cell::sync::Lazy;

/// Global sequence counter shared between frontend and backend
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Global log file handle
pub static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Open `log.log` inside the application directory, truncating any
/// previous run's output.
pub fn init_log_file(app_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(app_dir)
        .map_err(|e| format!("Failed to create app dir at {:?}: {}", app_dir, e))?;

    let log_path = app_dir.join("log.log");
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&log_path)
        .map_err(|e| format!("Failed to create log file {:?}: {}", log_path, e))?;

    let mut log_file = LOG_FILE.lock().map_err(|e| format!("Lock error: {}", e))?;
    *log_file = Some(file);

    Ok(log_path)
}

/// Write a log line in unified format
pub fn write_log(level: &str, category: &str, message: &str) {
    let seq = next_seq();
    let line = format!("{}|{}|{}|{}", seq, level, category, message);

    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut file) = *guard {
            if let Err(e) = writeln!(file, "{}", line) {
                eprintln!("[LOG_ERROR] Failed to write: {}", e);
            }
            let _ = file.flush();
        }
    }

    println!("{}", line);
}

// ============================================================================
// LOG FACADE BRIDGE
// ============================================================================

/// Routes `log` records from the library crates (the telemetry client) into
/// the unified log under their module path as the category.
struct FacadeBridge;

impl log::Log for FacadeBridge {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let level = match record.level() {
            log::Level::Error => "E",
            log::Level::Warn => "W",
            log::Level::Info => "I",
            log::Level::Debug | log::Level::Trace => "D",
        };
        write_log(level, record.target(), &record.args().to_string());
    }

    fn flush(&self) {}
}

static FACADE_BRIDGE: FacadeBridge = FacadeBridge;

pub fn install_facade_bridge() {
    if log::set_logger(&FACADE_BRIDGE).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

// ============================================================================
// TAURI COMMAND HANDLERS FOR LOGGING
// ============================================================================

/// Get next sequence number for frontend logging
#[tauri::command]
pub fn get_next_seq() -> u64 {
    next_seq()
}

/// Write a frontend log message (seq assigned and written together)
#[tauri::command]
pub fn log_frontend_atomic(level: String, category: String, message: String) -> Result<(), String> {
    write_log(&level, &category, &message);
    Ok(())
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("D", $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("I", $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("W", $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log("E", $cat, &format!($($arg)*))
    };
}

// Re-export the macros so they can be imported via `use crate::log_info;`
pub use log_debug;
pub use log_error;
pub use log_info;
pub use log_warn;
