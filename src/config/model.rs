// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::broker::ConsumeOptions;

/// Settings as read from a TOML file, before validation.
///
/// ```toml
/// tmp_dir = "/var/run/cmdpipe"
/// service = "cmdpipe"
/// propagate_env = ["LANG", "FOO=bar"]
/// prefetch = 10
/// poll_interval_ms = 400
/// accept_timeout_ms = 30000
/// strict_channels = false
/// consumer_tag = "build-host-1"
/// ```
///
/// Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawSettings {
    /// Directory holding rendezvous sockets (and, by default, the broker socket).
    pub tmp_dir: PathBuf,

    /// Service identifier scoping every broker key.
    pub service: String,

    /// Broker URL. If `None`, `redis+unix://<tmp_dir>/redis.sock` is used.
    pub broker_url: Option<String>,

    /// Variable names or `KEY=VALUE` assignments forwarded to the executor.
    pub propagate_env: Vec<String>,

    /// Deliveries an executor buffers ahead of the one it is running.
    pub prefetch: usize,

    /// How often an idle executor polls its queue.
    pub poll_interval_ms: u64,

    /// Upper bound on waiting for the executor to dial each channel.
    ///
    /// `None` waits forever.
    pub accept_timeout_ms: Option<u64>,

    /// Fail the dispatch if any channel never connected, instead of
    /// returning whatever arrived.
    pub strict_channels: bool,

    /// Stable consumer tag for this executor.
    ///
    /// When set, the executor reclaims whatever a previous run under the
    /// same tag left unacknowledged. When `None`, every run gets a fresh
    /// tag and recovers nothing. Never share a stable tag between live
    /// executors.
    pub consumer_tag: Option<String>,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from(DEFAULT_TMP_DIR),
            service: DEFAULT_SERVICE.to_string(),
            broker_url: None,
            propagate_env: Vec::new(),
            prefetch: 10,
            poll_interval_ms: 400,
            accept_timeout_ms: None,
            strict_channels: false,
            consumer_tag: None,
        }
    }
}

pub const DEFAULT_TMP_DIR: &str = "/tmp";
pub const DEFAULT_SERVICE: &str = "cmdpipe";

/// Validated settings. Build through `Settings::try_from(RawSettings)`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tmp_dir: PathBuf,
    pub service: String,
    pub broker_url: Option<String>,
    pub propagate_env: Vec<String>,
    pub prefetch: usize,
    pub poll_interval_ms: u64,
    pub accept_timeout_ms: Option<u64>,
    pub strict_channels: bool,
    pub consumer_tag: Option<String>,
}

impl Settings {
    pub(crate) fn new_unchecked(raw: RawSettings) -> Self {
        Self {
            tmp_dir: raw.tmp_dir,
            service: raw.service,
            broker_url: raw.broker_url,
            propagate_env: raw.propagate_env,
            prefetch: raw.prefetch,
            poll_interval_ms: raw.poll_interval_ms,
            accept_timeout_ms: raw.accept_timeout_ms,
            strict_channels: raw.strict_channels,
            consumer_tag: raw.consumer_tag,
        }
    }

    pub fn broker_url(&self) -> String {
        match &self.broker_url {
            Some(url) => url.clone(),
            None => format!("redis+unix://{}", self.tmp_dir.join("redis.sock").display()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout_ms.map(Duration::from_millis)
    }

    /// Consumer options for one executor run. A fresh tag is generated on
    /// every call unless `consumer_tag` is set.
    pub fn consume_options(&self) -> ConsumeOptions {
        let options = ConsumeOptions::new(self.prefetch, self.poll_interval());
        match &self.consumer_tag {
            Some(tag) => options.with_stable_tag(tag.clone()),
            None => options,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new_unchecked(RawSettings::default())
    }
}
