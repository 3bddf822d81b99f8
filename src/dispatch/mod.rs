// src/dispatch/mod.rs

//! Send path.
//!
//! One dispatch is one remote invocation:
//!
//! 1. bind the four rendezvous points,
//! 2. start the stdout / stderr / stdin relays and the exit-status reader,
//! 3. publish the descriptor on `command:<name>`,
//! 4. wait for the three stdio relays, then for the exit status,
//! 5. remove the rendezvous points (always, via [`RendezvousGuard`]).
//!
//! [`RendezvousGuard`]: crate::channel::RendezvousGuard

pub mod env;
pub mod stdio;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broker::{Broker, Queue, queue_name};
use crate::channel::relay::{receive_status, relay_from, relay_to};
use crate::channel::{ChannelRole, ChannelSet, RelayReport, StatusReport};
use crate::config::Settings;
use crate::descriptor::CommandDescriptor;
use crate::errors::{CmdpipeError, Result};
use crate::status::UNKNOWN_STATUS;

pub use env::propagated_env;
pub use stdio::LocalStdio;

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Status reported by the executor, or `-1`.
    pub status: i32,
    /// Channels no peer ever connected to.
    pub missing: Vec<ChannelRole>,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
    pub stdin_bytes: u64,
}

impl DispatchOutcome {
    /// Every channel connected. Without this, a `-1` status or short output
    /// means the invocation could not be completed.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct Dispatcher {
    settings: Settings,
    broker: Arc<dyn Broker>,
}

impl Dispatcher {
    pub fn new(settings: Settings, broker: Arc<dyn Broker>) -> Self {
        Self { settings, broker }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run `name` remotely with `params`, relaying `stdio`.
    ///
    /// Errors only for setup failures (broker, bind, publish) and, with
    /// `strict_channels`, for channels that never connected.
    pub async fn send(
        &self,
        name: &str,
        params: Vec<String>,
        stdio: LocalStdio,
    ) -> Result<DispatchOutcome> {
        let queue = self.broker.open_queue(&queue_name(name)).await?;

        // Listen on all four points before anything is published.
        let channels = ChannelSet::bind(&self.settings.tmp_dir)?;
        let (names, listeners, mut guard) = channels.split();
        let timeout = self.settings.accept_timeout();

        let LocalStdio {
            stdin,
            stdout,
            stderr,
        } = stdio;

        let out_task = tokio::spawn(relay_to(listeners.out, ChannelRole::Out, timeout, stdout));
        let err_task = tokio::spawn(relay_to(listeners.error, ChannelRole::Err, timeout, stderr));
        let in_task = tokio::spawn(relay_from(listeners.input, ChannelRole::In, timeout, stdin));
        let exit_task = tokio::spawn(receive_status(listeners.exit, timeout));

        let descriptor = CommandDescriptor {
            name: name.to_string(),
            params,
            env: propagated_env(&self.settings.propagate_env, |key| std::env::var(key).ok()),
            out: names.out,
            input: names.input,
            error: names.error,
            exit: names.exit,
        };

        if let Err(e) = publish(queue.as_ref(), &descriptor).await {
            out_task.abort();
            err_task.abort();
            in_task.abort();
            exit_task.abort();
            return Err(e);
        }
        info!(command = %name, queue = %queue.name(), "descriptor published");

        let (out, err, input) = tokio::join!(
            join_relay(out_task, ChannelRole::Out),
            join_relay(err_task, ChannelRole::Err),
            join_relay(in_task, ChannelRole::In),
        );
        let exit = match exit_task.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "exit status task failed");
                StatusReport {
                    connected: false,
                    status: UNKNOWN_STATUS,
                }
            }
        };

        guard.cleanup();

        let mut missing: Vec<ChannelRole> = [out, input, err]
            .iter()
            .filter(|r| !r.connected)
            .map(|r| r.role)
            .collect();
        if !exit.connected {
            missing.push(ChannelRole::Exit);
        }

        let outcome = DispatchOutcome {
            status: exit.status,
            missing,
            stdout_bytes: out.bytes,
            stderr_bytes: err.bytes,
            stdin_bytes: input.bytes,
        };
        info!(
            command = %name,
            status = outcome.status,
            complete = outcome.is_complete(),
            "dispatch finished"
        );

        if !outcome.is_complete() {
            warn!(missing = ?outcome.missing, "some channels never connected");
            if self.settings.strict_channels {
                return Err(CmdpipeError::PartialChannelSet(outcome.missing));
            }
        }

        Ok(outcome)
    }
}

async fn publish(queue: &dyn Queue, descriptor: &CommandDescriptor) -> Result<()> {
    let payload = descriptor.encode()?;
    debug!(payload = %String::from_utf8_lossy(&payload), "publishing descriptor");
    queue.publish(payload).await
}

async fn join_relay(task: JoinHandle<RelayReport>, role: ChannelRole) -> RelayReport {
    match task.await {
        Ok(report) => report,
        Err(e) => {
            warn!(%role, error = %e, "relay task failed");
            RelayReport {
                role,
                connected: false,
                bytes: 0,
            }
        }
    }
}
