// src/broker/mod.rs

//! Queue broker adapter.
//!
//! The broker only transports descriptors. Dispatcher and executor talk to
//! it through the [`Broker`] / [`Queue`] traits so the production Redis
//! backend can be swapped for the in-memory one in tests.
//!
//! - [`redis`] stores queues as Redis lists (reliable-queue pattern with a
//!   per-consumer unacked list).
//! - [`memory`] keeps the same semantics in-process.
//!
//! Delivery is at-least-once. A [`Delivery`] can be acknowledged or rejected;
//! dropping it does neither. Unacknowledged deliveries belong to the
//! consumer tag that fetched them and only return to `ready` when a consumer
//! with that same tag starts with `recover_unacked` set.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::naming::random_suffix;
use crate::errors::Result;

pub mod memory;
pub mod redis;

pub use memory::{MemoryBroker, QueueStats};
pub use self::redis::RedisBroker;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Queue name for a command: `command:<name>`.
pub fn queue_name(command: &str) -> String {
    format!("command:{command}")
}

/// A connection to the broker, scoped by a service identifier.
pub trait Broker: Send + Sync {
    fn open_queue(&self, name: &str) -> BoxFuture<'_, Result<Box<dyn Queue>>>;
}

/// One named queue.
pub trait Queue: Send + Sync {
    fn name(&self) -> &str;

    fn publish(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>>;

    /// Register a consumer under `options.tag`. It buffers at most
    /// `prefetch` deliveries ahead of its handler; counting the one being
    /// handled, up to `prefetch + 1` are unacknowledged at once.
    fn consume(&self, options: ConsumeOptions) -> BoxFuture<'_, Result<Consumer>>;
}

/// Base of generated consumer tags.
pub const DEFAULT_CONSUMER_TAG: &str = "command consumer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOptions {
    pub prefetch: usize,
    pub poll_interval: Duration,
    /// Names this consumer's unacknowledged list.
    pub tag: String,
    /// Move whatever an earlier consumer with the same tag left
    /// unacknowledged back to `ready` before fetching.
    pub recover_unacked: bool,
}

impl ConsumeOptions {
    /// Options for a consumer with a fresh, process-unique tag and no
    /// recovery.
    pub fn new(prefetch: usize, poll_interval: Duration) -> Self {
        Self {
            prefetch,
            poll_interval,
            tag: unique_consumer_tag(DEFAULT_CONSUMER_TAG),
            recover_unacked: false,
        }
    }

    /// Consume under a fixed tag and reclaim what it left unacknowledged.
    ///
    /// Only one live consumer may use a given stable tag.
    pub fn with_stable_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self.recover_unacked = true;
        self
    }
}

/// `<base>-<pid>-<random>`, distinct for every consumer.
pub fn unique_consumer_tag(base: &str) -> String {
    format!("{base}-{}-{}", std::process::id(), random_suffix(8))
}

/// Terminal actions for a delivery, implemented per backend.
pub trait Acknowledger: Send {
    fn ack(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
    fn reject(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

pub struct Delivery {
    payload: Vec<u8>,
    acker: Box<dyn Acknowledger>,
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("payload", &String::from_utf8_lossy(&self.payload))
            .finish_non_exhaustive()
    }
}

impl Delivery {
    pub fn new(payload: Vec<u8>, acker: Box<dyn Acknowledger>) -> Self {
        Self { payload, acker }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }

    /// Tell the broker this consumer will not handle the delivery.
    pub async fn reject(self) -> Result<()> {
        self.acker.reject().await
    }
}

/// Stream of deliveries fed by a background fetch loop.
///
/// The loop reserves buffer space before fetching, so no more than
/// `prefetch` deliveries are ever pulled ahead of the handler. The delivery
/// the handler currently holds is not counted.
pub struct Consumer {
    rx: mpsc::Receiver<Delivery>,
    fetcher: JoinHandle<()>,
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").finish_non_exhaustive()
    }
}

impl Consumer {
    /// Spawn the fetch loop. `fetch` returns `Ok(None)` when the queue is
    /// empty, after which the loop sleeps for `poll_interval`.
    pub fn spawn<F>(options: &ConsumeOptions, mut fetch: F) -> Self
    where
        F: FnMut() -> BoxFuture<'static, Result<Option<Delivery>>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Delivery>(options.prefetch.max(1));
        let poll_interval = options.poll_interval;

        let fetcher = tokio::spawn(async move {
            loop {
                let Ok(permit) = tx.reserve().await else {
                    break;
                };
                match fetch().await {
                    Ok(Some(delivery)) => permit.send(delivery),
                    Ok(None) => {
                        drop(permit);
                        tokio::time::sleep(poll_interval).await;
                    }
                    Err(e) => {
                        drop(permit);
                        warn!(error = %e, "error fetching delivery");
                        tokio::time::sleep(poll_interval).await;
                    }
                }
            }
            debug!("consumer fetch loop finished");
        });

        Self { rx, fetcher }
    }

    /// Next delivery; `None` once the fetch loop has stopped.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.fetcher.abort();
    }
}
