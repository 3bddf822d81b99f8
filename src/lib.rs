// src/lib.rs

pub mod broker;
pub mod channel;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod errors;
pub mod execute;
pub mod logging;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::broker::RedisBroker;
use crate::cli::{CliArgs, Mode};
use crate::config::{Settings, load_settings};
use crate::dispatch::{Dispatcher, LocalStdio};
use crate::execute::Executor;
use crate::status::process_exit_code;

/// High-level entry point used by `main.rs`.
///
/// Returns the exit code for this process:
/// - `send`: the remote program's status (`-1` becomes 255),
/// - `receive`: 0 after Ctrl-C.
pub async fn run(args: CliArgs) -> Result<i32> {
    let settings = load_settings(args.config.as_deref()).context("loading settings")?;

    match args.mode {
        Mode::Send { name, params } => send(settings, &name, params).await,
        Mode::Receive { name } => receive(settings, name).await,
    }
}

async fn send(settings: Settings, name: &str, params: Vec<String>) -> Result<i32> {
    let broker = RedisBroker::from_settings(&settings)
        .await
        .with_context(|| format!("connecting to broker at {}", settings.broker_url()))?;

    let dispatcher = Dispatcher::new(settings, Arc::new(broker));
    let outcome = dispatcher
        .send(name, params, LocalStdio::inherit())
        .await
        .with_context(|| format!("dispatching '{name}'"))?;

    Ok(process_exit_code(outcome.status))
}

async fn receive(settings: Settings, name: String) -> Result<i32> {
    let broker = RedisBroker::from_settings(&settings)
        .await
        .with_context(|| format!("connecting to broker at {}", settings.broker_url()))?;

    let executor = Executor::new(settings, name);

    tokio::select! {
        res = executor.run(&broker) => {
            res.with_context(|| format!("serving '{}'", executor.allowed()))?;
        }
        res = tokio::signal::ctrl_c() => {
            res.context("listening for Ctrl+C")?;
            info!("interrupted; shutting down executor");
        }
    }

    Ok(0)
}
