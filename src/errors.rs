// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::channel::ChannelRole;

#[derive(Error, Debug)]
pub enum CmdpipeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Descriptor encoding error: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cannot bind {role} rendezvous point at {path:?}: {source}")]
    Bind {
        role: ChannelRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("channels never connected: {0:?}")]
    PartialChannelSet(Vec<ChannelRole>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CmdpipeError>;
