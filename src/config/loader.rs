//! TOML configuration loading, env-var overrides, and atomic saves.
//!
//! # Loading order
//! 1. Parse `~/.convoy/config.toml` (or the path in `CONVOY_CONFIG`)
//! 2. Apply `CONVOY_*` environment variable overrides
//! 3. Fall back to [`EngineConfig::default()`] if the file is missing
//!
//! # Atomic save
//! Writes to `<path>.tmp`, backs up the existing file to `<path>.bak`, then
//! renames the temp file into place to avoid partial writes corrupting the
//! config file.

use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

use super::schema::EngineConfig;

/// Returns the default config file path: `~/.convoy/config.toml`.
pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::home_dir()
        .map(|h| h.join(".convoy").join("config.toml"))
        .ok_or_else(|| "could not determine home directory".to_string())
}

/// Loads [`EngineConfig`] from `path`, falling back to defaults if the file
/// does not exist, then applying environment variable overrides.
pub fn load_config(path: &Path) -> Result<EngineConfig, String> {
    let mut config = match fs::read_to_string(path) {
        Ok(content) => toml::from_str::<EngineConfig>(&content)
            .map_err(|e| format!("failed to parse config at {path:?}: {e}"))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => EngineConfig::default(),
        Err(e) => return Err(format!("failed to read config at {path:?}: {e}")),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Loads config from the default path (or `CONVOY_CONFIG` if set).
pub fn load_default_config() -> EngineConfig {
    let path = env::var("CONVOY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path().unwrap_or_else(|_| PathBuf::from("config.toml")));

    load_config(&path).unwrap_or_default()
}

/// Applies `CONVOY_*` environment variable overrides to `config`.
///
/// Supported overrides:
/// - `CONVOY_MAX_MESSAGES`              → `conversation.max_messages`
/// - `CONVOY_CONVERSATION_MAX_AGE_HOURS`→ `conversation.conversation_max_age_hours`
/// - `CONVOY_APPROVAL_TIMEOUT_SECONDS`  → `approval.default_timeout_seconds`
/// - `CONVOY_APPROVAL_SWEEP_SECONDS`    → `approval.sweep_interval_seconds`
/// - `CONVOY_CLEANUP_INTERVAL_HOURS`    → `cleanup.interval_hours`
/// - `CONVOY_MAX_SWITCHES`              → `agents.max_switches`
fn apply_env_overrides(config: &mut EngineConfig) {
    if let Ok(v) = env::var("CONVOY_MAX_MESSAGES") {
        if let Ok(n) = v.parse::<usize>() {
            config.conversation.max_messages = n;
        }
    }
    if let Ok(v) = env::var("CONVOY_CONVERSATION_MAX_AGE_HOURS") {
        if let Ok(n) = v.parse::<i64>() {
            config.conversation.conversation_max_age_hours = n;
        }
    }
    if let Ok(v) = env::var("CONVOY_APPROVAL_TIMEOUT_SECONDS") {
        if let Ok(n) = v.parse::<i64>() {
            config.approval.default_timeout_seconds = n;
        }
    }
    if let Ok(v) = env::var("CONVOY_APPROVAL_SWEEP_SECONDS") {
        if let Ok(n) = v.parse::<u64>() {
            config.approval.sweep_interval_seconds = n;
        }
    }
    if let Ok(v) = env::var("CONVOY_CLEANUP_INTERVAL_HOURS") {
        if let Ok(n) = v.parse::<u64>() {
            config.cleanup.interval_hours = n;
        }
    }
    if let Ok(v) = env::var("CONVOY_MAX_SWITCHES") {
        if let Ok(n) = v.parse::<u32>() {
            config.agents.max_switches = n;
        }
    }
}

/// Atomically saves `config` to `path`.
///
/// Writes to `<path>.tmp`, backs up an existing file to `<path>.bak`, then
/// renames the temp file over `path`.
pub fn save_config(path: &Path, config: &EngineConfig) -> Result<(), String> {
    let content = toml::to_string_pretty(config).map_err(|e| format!("failed to serialise config: {e}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("failed to create config dir: {e}"))?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, &content).map_err(|e| format!("failed to write temp config: {e}"))?;

    if path.exists() {
        let bak_path = path.with_extension("toml.bak");
        fs::copy(path, &bak_path).map_err(|e| format!("failed to backup config: {e}"))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| format!("failed to replace config file: {e}"))?;

    Ok(())
}
