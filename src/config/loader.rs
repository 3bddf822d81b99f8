// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{DEFAULT_TMP_DIR, RawSettings, Settings};
use crate::errors::{CmdpipeError, Result};

pub const ENV_CONFIG: &str = "CMDPIPE_CONFIG";
pub const ENV_TMP_DIR: &str = "CMDPIPE_TMP_DIR";
pub const ENV_PROPAGATE: &str = "CMDPIPE_ENV";
pub const ENV_BROKER_URL: &str = "CMDPIPE_BROKER_URL";
pub const ENV_SERVICE: &str = "CMDPIPE_SERVICE";
pub const ENV_ACCEPT_TIMEOUT: &str = "CMDPIPE_ACCEPT_TIMEOUT_MS";
pub const ENV_STRICT_CHANNELS: &str = "CMDPIPE_STRICT_CHANNELS";
pub const ENV_CONSUMER_TAG: &str = "CMDPIPE_CONSUMER_TAG";

/// Load a settings file and return the raw, unvalidated `RawSettings`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawSettings = toml::from_str(&contents)?;

    Ok(raw)
}

/// Build the effective settings for this process.
///
/// - Starts from defaults, or from the TOML file at `path` (falling back to
///   `CMDPIPE_CONFIG` when `path` is `None`).
/// - Applies `CMDPIPE_*` environment overrides.
/// - Validates.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = path.map(Path::to_path_buf).or_else(default_config_path);

    let mut raw = match &path {
        Some(path) => {
            debug!(path = %path.display(), "loading settings file");
            load_from_path(path)?
        }
        None => RawSettings::default(),
    };

    apply_env_overrides(&mut raw, |key| std::env::var(key).ok())?;
    Settings::try_from(raw)
}

/// Apply `CMDPIPE_*` overrides, reading variables through `lookup`.
///
/// Empty values count as unset, except for `CMDPIPE_ENV` where an empty
/// value clears the propagation list.
pub fn apply_env_overrides<F>(raw: &mut RawSettings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(ENV_TMP_DIR) {
        raw.tmp_dir = if dir.is_empty() {
            PathBuf::from(DEFAULT_TMP_DIR)
        } else {
            PathBuf::from(dir)
        };
    }

    if let Some(list) = lookup(ENV_PROPAGATE) {
        raw.propagate_env = split_env_list(&list);
    }

    if let Some(url) = non_empty(lookup(ENV_BROKER_URL)) {
        raw.broker_url = Some(url);
    }

    if let Some(service) = non_empty(lookup(ENV_SERVICE)) {
        raw.service = service;
    }

    if let Some(ms) = non_empty(lookup(ENV_ACCEPT_TIMEOUT)) {
        let ms = ms.trim().parse::<u64>().map_err(|e| {
            CmdpipeError::Config(format!("{ENV_ACCEPT_TIMEOUT}={ms:?} is not a number: {e}"))
        })?;
        raw.accept_timeout_ms = Some(ms);
    }

    if let Some(flag) = non_empty(lookup(ENV_STRICT_CHANNELS)) {
        raw.strict_channels = parse_flag(&flag).ok_or_else(|| {
            CmdpipeError::Config(format!("{ENV_STRICT_CHANNELS}={flag:?} is not a boolean"))
        })?;
    }

    if let Some(tag) = non_empty(lookup(ENV_CONSUMER_TAG)) {
        raw.consumer_tag = Some(tag);
    }

    Ok(())
}

/// Split a `;`-separated propagation list, dropping empty entries.
pub fn split_env_list(list: &str) -> Vec<String> {
    list.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Settings file named by `CMDPIPE_CONFIG`, if any.
pub fn default_config_path() -> Option<PathBuf> {
    non_empty(std::env::var(ENV_CONFIG).ok()).map(PathBuf::from)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
