// src/config/validate.rs

use crate::config::model::{RawSettings, Settings};
use crate::errors::{CmdpipeError, Result};

impl TryFrom<RawSettings> for Settings {
    type Error = CmdpipeError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(Settings::new_unchecked(raw))
    }
}

fn validate_raw_settings(raw: &RawSettings) -> Result<()> {
    validate_broker(raw)?;
    validate_consumer(raw)?;
    validate_timeouts(raw)?;
    Ok(())
}

fn validate_broker(raw: &RawSettings) -> Result<()> {
    if raw.service.trim().is_empty() {
        return Err(CmdpipeError::Config(
            "service must not be empty".to_string(),
        ));
    }
    if raw.tmp_dir.as_os_str().is_empty() {
        return Err(CmdpipeError::Config(
            "tmp_dir must not be empty".to_string(),
        ));
    }
    if let Some(url) = &raw.broker_url {
        if url.trim().is_empty() {
            return Err(CmdpipeError::Config(
                "broker_url must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_consumer(raw: &RawSettings) -> Result<()> {
    if raw.prefetch == 0 {
        return Err(CmdpipeError::Config(
            "prefetch must be >= 1 (got 0)".to_string(),
        ));
    }
    if raw.poll_interval_ms == 0 {
        return Err(CmdpipeError::Config(
            "poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if let Some(tag) = &raw.consumer_tag {
        if tag.trim().is_empty() {
            return Err(CmdpipeError::Config(
                "consumer_tag must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_timeouts(raw: &RawSettings) -> Result<()> {
    if raw.accept_timeout_ms == Some(0) {
        return Err(CmdpipeError::Config(
            "accept_timeout_ms must be >= 1 when set (got 0)".to_string(),
        ));
    }
    Ok(())
}
