// src/broker/redis.rs

//! Redis-backed queues.
//!
//! Key layout, for service `cmdpipe` and queue `command:echo`:
//!
//! - `cmdpipe::queues` – set of known queue names
//! - `cmdpipe::queue::[command:echo]::ready` – pending payloads
//! - `cmdpipe::queue::[command:echo]::unacked::<consumer>` – in flight
//! - `cmdpipe::queue::[command:echo]::rejected` – rejected payloads
//!
//! Publishing pushes onto `ready`. Consumers move payloads atomically from
//! `ready` into their own `unacked` list; ack removes them, reject moves them
//! to `rejected`. Every consumer gets its own tag, so starting one never
//! touches another's in-flight work. A consumer started with a stable tag
//! and `recover_unacked` first returns that tag's leftovers to `ready`.

use ::redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use super::{
    Acknowledger, BoxFuture, Broker, ConsumeOptions, Consumer, Delivery, Queue,
};
use crate::config::Settings;
use crate::errors::Result;

pub struct RedisBroker {
    service: String,
    conn: MultiplexedConnection,
}

impl RedisBroker {
    pub async fn connect(url: &str, service: &str) -> Result<Self> {
        let client = ::redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(%url, %service, "connected to redis broker");

        Ok(Self {
            service: service.to_string(),
            conn,
        })
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        Self::connect(&settings.broker_url(), &settings.service).await
    }
}

impl Broker for RedisBroker {
    fn open_queue(&self, name: &str) -> BoxFuture<'_, Result<Box<dyn Queue>>> {
        let name = name.to_string();
        let service = self.service.clone();
        let registry = format!("{}::queues", self.service);
        let mut conn = self.conn.clone();

        Box::pin(async move {
            let _: i64 = ::redis::cmd("SADD")
                .arg(&registry)
                .arg(&name)
                .query_async(&mut conn)
                .await?;
            debug!(queue = %name, "opened redis queue");

            Ok(Box::new(RedisQueue {
                ready: QueueKeys::ready(&service, &name),
                name,
                service,
                conn,
            }) as Box<dyn Queue>)
        })
    }
}

#[derive(Debug, Clone)]
struct QueueKeys {
    ready: String,
    unacked: String,
    rejected: String,
}

impl QueueKeys {
    fn new(service: &str, queue: &str, consumer_tag: &str) -> Self {
        let base = Self::base(service, queue);
        Self {
            ready: format!("{base}::ready"),
            unacked: format!("{base}::unacked::{consumer_tag}"),
            rejected: format!("{base}::rejected"),
        }
    }

    fn base(service: &str, queue: &str) -> String {
        format!("{service}::queue::[{queue}]")
    }

    fn ready(service: &str, queue: &str) -> String {
        format!("{}::ready", Self::base(service, queue))
    }
}

struct RedisQueue {
    name: String,
    service: String,
    ready: String,
    conn: MultiplexedConnection,
}

/// Move everything in `keys.unacked` back onto `keys.ready`.
async fn return_unacked(conn: &mut MultiplexedConnection, keys: &QueueKeys) -> Result<usize> {
    let mut returned = 0;
    loop {
        let moved: Option<Vec<u8>> = ::redis::cmd("RPOPLPUSH")
            .arg(&keys.unacked)
            .arg(&keys.ready)
            .query_async(&mut *conn)
            .await?;
        if moved.is_none() {
            break;
        }
        returned += 1;
    }
    Ok(returned)
}

impl Queue for RedisQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>> {
        let mut conn = self.conn.clone();
        Box::pin(async move {
            let _: i64 = ::redis::cmd("LPUSH")
                .arg(&self.ready)
                .arg(payload)
                .query_async(&mut conn)
                .await?;
            debug!(queue = %self.name, "published payload");
            Ok(())
        })
    }

    fn consume(&self, options: ConsumeOptions) -> BoxFuture<'_, Result<Consumer>> {
        Box::pin(async move {
            let keys = QueueKeys::new(&self.service, &self.name, &options.tag);
            let mut conn = self.conn.clone();

            if options.recover_unacked {
                let returned = return_unacked(&mut conn, &keys).await?;
                if returned > 0 {
                    info!(
                        queue = %self.name,
                        tag = %options.tag,
                        returned,
                        "returned unacked deliveries to ready"
                    );
                }
            }

            let consumer = Consumer::spawn(&options, move || {
                let mut conn = conn.clone();
                let keys = keys.clone();
                Box::pin(async move {
                    let payload: Option<Vec<u8>> = ::redis::cmd("RPOPLPUSH")
                        .arg(&keys.ready)
                        .arg(&keys.unacked)
                        .query_async(&mut conn)
                        .await?;

                    Ok(payload.map(|payload| {
                        let acker = RedisAcker {
                            conn,
                            keys,
                            payload: payload.clone(),
                        };
                        Delivery::new(payload, Box::new(acker))
                    }))
                })
            });

            info!(
                queue = %self.name,
                tag = %options.tag,
                prefetch = options.prefetch,
                "consumer registered"
            );
            Ok(consumer)
        })
    }
}

struct RedisAcker {
    conn: MultiplexedConnection,
    keys: QueueKeys,
    payload: Vec<u8>,
}

impl Acknowledger for RedisAcker {
    fn ack(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        let RedisAcker {
            mut conn,
            keys,
            payload,
        } = *self;
        Box::pin(async move {
            let _: i64 = ::redis::cmd("LREM")
                .arg(&keys.unacked)
                .arg(1)
                .arg(payload)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
    }

    fn reject(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        let RedisAcker {
            mut conn,
            keys,
            payload,
        } = *self;
        Box::pin(async move {
            let () = ::redis::pipe()
                .atomic()
                .cmd("LREM")
                .arg(&keys.unacked)
                .arg(1)
                .arg(&payload)
                .ignore()
                .cmd("LPUSH")
                .arg(&keys.rejected)
                .arg(&payload)
                .ignore()
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
    }
}
