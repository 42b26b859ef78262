//! Centralized path definitions for configuration and log files.
//!
//! Functions take the config directory explicitly so the CLI, the server and
//! tests can each point at their own location.

use std::path::{Path, PathBuf};

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";
pub const CREDENTIALS_FILE: &str = ".credentials";

// ── Directory names ──────────────────────────────────────────────

pub const DEFAULT_CONFIG_DIR: &str = ".study-commands";
pub const COMMAND_LOGS_DIR: &str = "command-logs";

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE)
}

pub fn credentials_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CREDENTIALS_FILE)
}

pub fn command_logs_dir(config_dir: &Path) -> PathBuf {
    config_dir.join(COMMAND_LOGS_DIR)
}
