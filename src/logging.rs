// src/logging.rs

//! Logging setup for `cmdpipe` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `CMDPIPE_LOG` environment variable (e.g. "info", "debug")
//! 3. the mode's default: `warn` for `send`, `info` for `receive`
//!
//! Logs go to STDERR. Stdout carries nothing but relayed program output.
//! In `send` mode stderr also carries the remote program's stderr, hence
//! the quieter default there.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::{LogLevel, Mode};

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, mode: &Mode) -> Result<()> {
    let env_level = std::env::var("CMDPIPE_LOG").ok();
    let level = resolve_level(cli_level, env_level.as_deref(), default_level(mode));

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

pub fn default_level(mode: &Mode) -> Level {
    match mode {
        Mode::Send { .. } => Level::WARN,
        Mode::Receive { .. } => Level::INFO,
    }
}

/// Pick the effective level; unparsable env values fall through to `default`.
pub fn resolve_level(cli_level: Option<LogLevel>, env_level: Option<&str>, default: Level) -> Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => env_level.and_then(parse_level_str).unwrap_or(default),
    }
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
