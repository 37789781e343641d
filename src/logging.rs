//! Logging configuration for txt2sql.
//!
//! The REPL writes logs to a file so that stdout stays clean for answers; the
//! dashboard logs to stderr.

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const APP_DIR: &str = "txt2sql";
const LOG_FILE: &str = "txt2sql.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes file logging for the REPL.
///
/// Location: `~/.local/state/txt2sql/txt2sql.log` on Linux (XDG state
/// directory), or the platform-appropriate state/config directory elsewhere.
/// Failing to create the file disables logging rather than falling back to
/// stdout.
pub fn init_file_logging() {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            return;
        }
    }

    // Truncated on each run.
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes stderr logging for the dashboard server.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the path for the REPL log file.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join(APP_DIR).join(LOG_FILE);
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join(APP_DIR).join(LOG_FILE);
    }

    std::env::temp_dir().join(LOG_FILE)
}
