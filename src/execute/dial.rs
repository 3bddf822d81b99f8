// src/execute/dial.rs

//! Executor side of the channel handshake.

use std::path::Path;

use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::channel::{ChannelRole, resolve};
use crate::descriptor::CommandDescriptor;

/// Connections to a descriptor's channels. A `None` slot failed to dial.
#[derive(Debug, Default)]
pub struct DialedChannels {
    pub out: Option<UnixStream>,
    pub input: Option<UnixStream>,
    pub error: Option<UnixStream>,
    pub exit: Option<UnixStream>,
}

impl DialedChannels {
    pub fn missing(&self) -> Vec<ChannelRole> {
        let slots = [
            (ChannelRole::Out, self.out.is_some()),
            (ChannelRole::In, self.input.is_some()),
            (ChannelRole::Err, self.error.is_some()),
            (ChannelRole::Exit, self.exit.is_some()),
        ];
        slots
            .into_iter()
            .filter(|(_, present)| !present)
            .map(|(role, _)| role)
            .collect()
    }
}

/// Dial all four channels in the order out, in, err, exit.
///
/// A failed dial is logged and leaves its slot empty; the remaining
/// channels are still dialed.
pub async fn dial_all(dir: &Path, descriptor: &CommandDescriptor) -> DialedChannels {
    DialedChannels {
        out: dial(dir, descriptor, ChannelRole::Out).await,
        input: dial(dir, descriptor, ChannelRole::In).await,
        error: dial(dir, descriptor, ChannelRole::Err).await,
        exit: dial(dir, descriptor, ChannelRole::Exit).await,
    }
}

async fn dial(dir: &Path, descriptor: &CommandDescriptor, role: ChannelRole) -> Option<UnixStream> {
    let path = resolve(dir, descriptor.address(role));
    match UnixStream::connect(&path).await {
        Ok(stream) => {
            debug!(%role, path = %path.display(), "dialed channel");
            Some(stream)
        }
        Err(e) => {
            warn!(%role, path = %path.display(), error = %e, "error dialing channel");
            None
        }
    }
}
