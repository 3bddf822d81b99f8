// src/descriptor.rs

//! The command descriptor: the one message handed from dispatcher to executor.
//!
//! On the wire this is a JSON object:
//!
//! ```json
//! {
//!   "name": "echo",
//!   "params": ["hi"],
//!   "env": ["FOO=bar"],
//!   "out": "cmdpipe-a1B2c3-out",
//!   "in": "cmdpipe-a1B2c3-in",
//!   "error": "cmdpipe-a1B2c3-err",
//!   "exit": "cmdpipe-a1B2c3-exit"
//! }
//! ```
//!
//! Channel addresses are file names relative to the rendezvous directory;
//! each side joins them onto its own configured `tmp_dir`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::channel::ChannelRole;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    /// Program to run. Also the queue routing key and the executor's
    /// authorization check.
    pub name: String,

    /// Arguments passed verbatim, in order.
    #[serde(default, deserialize_with = "nullable_list")]
    pub params: Vec<String>,

    /// `KEY=VALUE` entries appended to the executor's own environment.
    #[serde(default, deserialize_with = "nullable_list", skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    pub out: String,
    #[serde(rename = "in")]
    pub input: String,
    pub error: String,
    pub exit: String,
}

impl CommandDescriptor {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Address of the given channel, as named in this descriptor.
    pub fn address(&self, role: ChannelRole) -> &str {
        match role {
            ChannelRole::Out => &self.out,
            ChannelRole::In => &self.input,
            ChannelRole::Err => &self.error,
            ChannelRole::Exit => &self.exit,
        }
    }
}

/// Senders that marshal an empty list as `null` are accepted.
fn nullable_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
