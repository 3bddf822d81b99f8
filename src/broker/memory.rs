// src/broker/memory.rs

//! In-process broker with the same ready / unacked / rejected semantics as
//! the Redis backend, including one unacked list per consumer tag. Each
//! `MemoryBroker` is an isolated namespace.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{
    Acknowledger, BoxFuture, Broker, ConsumeOptions, Consumer, Delivery, Queue,
};
use crate::errors::Result;

#[derive(Debug, Default)]
struct QueueLists {
    ready: VecDeque<Vec<u8>>,
    unacked: HashMap<String, Vec<Vec<u8>>>,
    rejected: Vec<Vec<u8>>,
}

impl QueueLists {
    fn unacked_len(&self) -> usize {
        self.unacked.values().map(Vec::len).sum()
    }
}

type SharedLists = Arc<Mutex<QueueLists>>;

fn lock(lists: &SharedLists) -> MutexGuard<'_, QueueLists> {
    lists.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Snapshot of one queue's list lengths. `unacked` sums every consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub ready: usize,
    pub unacked: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    queues: Arc<Mutex<HashMap<String, SharedLists>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lists(&self, name: &str) -> SharedLists {
        let mut queues = self
            .queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(queues.entry(name.to_string()).or_default())
    }

    pub fn stats(&self, name: &str) -> QueueStats {
        let lists = self.lists(name);
        let lists = lock(&lists);
        QueueStats {
            ready: lists.ready.len(),
            unacked: lists.unacked_len(),
            rejected: lists.rejected.len(),
        }
    }

    /// Unacknowledged deliveries held under one consumer tag.
    pub fn unacked_for(&self, name: &str, tag: &str) -> usize {
        let lists = self.lists(name);
        let lists = lock(&lists);
        lists.unacked.get(tag).map_or(0, Vec::len)
    }

    /// Payloads currently waiting in `ready`, oldest first.
    pub fn ready_payloads(&self, name: &str) -> Vec<Vec<u8>> {
        let lists = self.lists(name);
        let lists = lock(&lists);
        lists.ready.iter().cloned().collect()
    }
}

impl Broker for MemoryBroker {
    fn open_queue(&self, name: &str) -> BoxFuture<'_, Result<Box<dyn Queue>>> {
        let queue = MemoryQueue {
            name: name.to_string(),
            lists: self.lists(name),
        };
        Box::pin(async move { Ok(Box::new(queue) as Box<dyn Queue>) })
    }
}

struct MemoryQueue {
    name: String,
    lists: SharedLists,
}

impl Queue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>> {
        lock(&self.lists).ready.push_back(payload);
        debug!(queue = %self.name, "published payload");
        Box::pin(async { Ok(()) })
    }

    fn consume(&self, options: ConsumeOptions) -> BoxFuture<'_, Result<Consumer>> {
        if options.recover_unacked {
            let mut lists = lock(&self.lists);
            let leftovers = lists.unacked.remove(&options.tag).unwrap_or_default();
            if !leftovers.is_empty() {
                debug!(
                    queue = %self.name,
                    tag = %options.tag,
                    returned = leftovers.len(),
                    "returned unacked deliveries to ready"
                );
            }
            for payload in leftovers.into_iter().rev() {
                lists.ready.push_front(payload);
            }
        }

        let lists = Arc::clone(&self.lists);
        let tag = options.tag.clone();
        let consumer = Consumer::spawn(&options, move || {
            let delivery = fetch_one(&lists, &tag);
            Box::pin(async move { Ok(delivery) })
        });
        Box::pin(async move { Ok(consumer) })
    }
}

fn fetch_one(lists: &SharedLists, tag: &str) -> Option<Delivery> {
    let payload = {
        let mut guard = lock(lists);
        let payload = guard.ready.pop_front()?;
        guard
            .unacked
            .entry(tag.to_string())
            .or_default()
            .push(payload.clone());
        payload
    };

    let acker = MemoryAcker {
        lists: Arc::clone(lists),
        tag: tag.to_string(),
        payload: payload.clone(),
    };
    Some(Delivery::new(payload, Box::new(acker)))
}

struct MemoryAcker {
    lists: SharedLists,
    tag: String,
    payload: Vec<u8>,
}

impl MemoryAcker {
    fn take_unacked(&self, lists: &mut QueueLists) {
        let Some(held) = lists.unacked.get_mut(&self.tag) else {
            return;
        };
        if let Some(pos) = held.iter().position(|p| *p == self.payload) {
            held.remove(pos);
        }
        if held.is_empty() {
            lists.unacked.remove(&self.tag);
        }
    }
}

impl Acknowledger for MemoryAcker {
    fn ack(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        {
            let mut lists = lock(&self.lists);
            self.take_unacked(&mut lists);
        }
        Box::pin(async { Ok(()) })
    }

    fn reject(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        {
            let mut lists = lock(&self.lists);
            self.take_unacked(&mut lists);
            lists.rejected.push(self.payload.clone());
        }
        Box::pin(async { Ok(()) })
    }
}
