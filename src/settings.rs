use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::Difficulty;
use crate::storage::{read_json, write_json, StorageError};

// ── LLM provider types ──────────────────────────────────────────

/// Which LLM provider backs the generative commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LlmProvider {
    #[default]
    Anthropic,
    OpenAiCompatible,
}

/// Provider configuration. The API key is never stored here; it lives in a
/// separate credentials file, see [`load_api_key`]/[`save_api_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LlmProviderConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Base URL for OpenAI-compatible providers (ignored for Anthropic).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model override. None = use provider default.
    #[serde(default)]
    pub model: Option<String>,
}

// ── Timeouts ────────────────────────────────────────────────────

const DEFAULT_TIMEOUT_SECS: u64 = 120;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Upper bound for each generative command's inference call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeoutSettings {
    #[serde(default = "default_timeout_secs")]
    pub explain_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub visualize_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub compare_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            explain_secs: DEFAULT_TIMEOUT_SECS,
            visualize_secs: DEFAULT_TIMEOUT_SECS,
            compare_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl TimeoutSettings {
    pub fn explain(&self) -> Duration {
        Duration::from_secs(self.explain_secs)
    }

    pub fn visualize(&self) -> Duration {
        Duration::from_secs(self.visualize_secs)
    }

    pub fn compare(&self) -> Duration {
        Duration::from_secs(self.compare_secs)
    }
}

// ── Engine settings ─────────────────────────────────────────────

const SETTINGS_VERSION: u32 = 1;

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

/// Settings stored as `settings.json` in the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EngineSettings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub llm: LlmProviderConfig,
    /// Base URL of the content backend serving page text.
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub default_difficulty: Difficulty,
    /// Write a JSONL line per executed command under `command-logs/`.
    #[serde(default = "default_true")]
    pub audit_log: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            llm: LlmProviderConfig::default(),
            backend_url: None,
            timeouts: TimeoutSettings::default(),
            default_difficulty: Difficulty::default(),
            audit_log: true,
        }
    }
}

/// Load the API key from the separate credentials file.
pub fn load_api_key(config_dir: &Path) -> Option<String> {
    let path = crate::paths::credentials_path(config_dir);
    std::fs::read_to_string(path)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Save the API key to the separate credentials file. An empty key removes it.
pub fn save_api_key(config_dir: &Path, key: &str) -> Result<(), StorageError> {
    std::fs::create_dir_all(config_dir)?;
    let path = crate::paths::credentials_path(config_dir);
    if key.is_empty() {
        let _ = std::fs::remove_file(&path);
    } else {
        crate::storage::atomic_write(&path, key.as_bytes())?;
    }
    Ok(())
}

/// Load settings from the config directory. A missing file yields defaults;
/// a malformed one is an error.
pub fn load_settings(config_dir: &Path) -> Result<EngineSettings, StorageError> {
    let path = crate::paths::settings_path(config_dir);
    if !path.exists() {
        return Ok(EngineSettings::default());
    }
    read_json::<EngineSettings>(&path)
}

pub fn save_settings(config_dir: &Path, settings: &EngineSettings) -> Result<(), StorageError> {
    std::fs::create_dir_all(config_dir)?;
    write_json(&crate::paths::settings_path(config_dir), settings)
}
