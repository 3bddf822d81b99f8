// src/execute/mod.rs

//! Receive path.
//!
//! An executor serves exactly one command name. It consumes
//! `command:<name>` one delivery at a time:
//!
//! - undecodable payloads are logged and dropped (left unacknowledged),
//! - descriptors naming another command are rejected without running
//!   anything,
//! - everything else runs to completion, the status is written to the
//!   `exit` channel and the delivery is acknowledged.
//!
//! Delivery is at-least-once, so the same descriptor may run twice.

pub mod dial;
pub mod process;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::broker::{Broker, Consumer, Delivery, queue_name};
use crate::config::Settings;
use crate::descriptor::CommandDescriptor;
use crate::errors::Result;
use crate::status::encode_status;

pub use dial::{DialedChannels, dial_all};
pub use process::{ProgramStdio, run_program};

/// What the executor did with one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Payload was not a descriptor; dropped.
    Malformed,
    /// Descriptor named a command this executor does not serve.
    Rejected { name: String },
    /// Program ran (or failed to start) and reported `status`.
    Completed { status: i32 },
}

pub struct Executor {
    settings: Settings,
    allowed: String,
}

impl Executor {
    pub fn new(settings: Settings, allowed: impl Into<String>) -> Self {
        Self {
            settings,
            allowed: allowed.into(),
        }
    }

    pub fn allowed(&self) -> &str {
        &self.allowed
    }

    /// Register on `command:<allowed>` and serve deliveries until the
    /// consumer stops.
    pub async fn run(&self, broker: &dyn Broker) -> Result<()> {
        let queue = broker.open_queue(&queue_name(&self.allowed)).await?;
        let options = self.settings.consume_options();
        let tag = options.tag.clone();
        let consumer = queue.consume(options).await?;

        info!(command = %self.allowed, queue = %queue.name(), %tag, "executor consuming");
        self.serve(consumer).await;
        Ok(())
    }

    /// Handle deliveries strictly one after another.
    pub async fn serve(&self, mut consumer: Consumer) {
        while let Some(delivery) = consumer.next().await {
            let outcome = self.handle_delivery(delivery).await;
            debug!(?outcome, "delivery handled");
        }
        info!(command = %self.allowed, "consumer closed; executor stopping");
    }

    pub async fn handle_delivery(&self, delivery: Delivery) -> DeliveryOutcome {
        let descriptor = match CommandDescriptor::decode(delivery.payload()) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    error = %e,
                    payload = %String::from_utf8_lossy(delivery.payload()),
                    "cannot decode descriptor; dropping delivery"
                );
                return DeliveryOutcome::Malformed;
            }
        };
        info!(command = %descriptor.name, "got command");

        let channels = dial_all(&self.settings.tmp_dir, &descriptor).await;
        let missing = channels.missing();
        if !missing.is_empty() {
            warn!(?missing, "continuing with partial channel set");
        }

        if descriptor.name != self.allowed {
            warn!(
                command = %descriptor.name,
                allowed = %self.allowed,
                "rejecting command"
            );
            if let Err(e) = delivery.reject().await {
                warn!(error = %e, "failed to reject delivery");
            }
            return DeliveryOutcome::Rejected {
                name: descriptor.name,
            };
        }

        let DialedChannels {
            out,
            input,
            error,
            exit,
        } = channels;
        let stdio = ProgramStdio {
            stdout: out,
            stdin: input,
            stderr: error,
        };
        let status = run_program(&self.allowed, &descriptor, stdio).await;

        match exit {
            Some(mut exit) => {
                debug!(status, "writing exit status");
                if let Err(e) = exit.write_all(encode_status(status).as_bytes()).await {
                    warn!(error = %e, "failed to write exit status");
                }
                if let Err(e) = exit.shutdown().await {
                    debug!(error = %e, "exit channel already closed");
                }
            }
            None => warn!(status, "no exit channel; status not reported"),
        }

        if let Err(e) = delivery.ack().await {
            warn!(error = %e, "failed to acknowledge delivery");
        }
        info!(command = %descriptor.name, status, "command completed");

        DeliveryOutcome::Completed { status }
    }
}
