// src/channel/set.rs

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::net::UnixListener;
use tracing::{debug, warn};

use super::ChannelRole;
use super::naming::{rendezvous_name, resolve};
use crate::errors::{CmdpipeError, Result};

/// Rendezvous names of one invocation, as published in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    pub out: String,
    pub input: String,
    pub error: String,
    pub exit: String,
}

impl ChannelNames {
    pub fn get(&self, role: ChannelRole) -> &str {
        match role {
            ChannelRole::Out => &self.out,
            ChannelRole::In => &self.input,
            ChannelRole::Err => &self.error,
            ChannelRole::Exit => &self.exit,
        }
    }
}

/// The bound listeners, one per role.
#[derive(Debug)]
pub struct ChannelListeners {
    pub out: UnixListener,
    pub input: UnixListener,
    pub error: UnixListener,
    pub exit: UnixListener,
}

/// Removes rendezvous socket files when dropped.
///
/// Each path is registered as soon as its bind succeeds, so a set that
/// failed halfway still gets cleaned up. Removal tolerates files that are
/// already gone.
#[derive(Debug, Default)]
pub struct RendezvousGuard {
    paths: Vec<PathBuf>,
}

impl RendezvousGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Remove every registered socket file. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed rendezvous point"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove rendezvous point"
                ),
            }
        }
    }
}

impl Drop for RendezvousGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Four freshly bound rendezvous points.
#[derive(Debug)]
pub struct ChannelSet {
    names: ChannelNames,
    listeners: ChannelListeners,
    guard: RendezvousGuard,
}

impl ChannelSet {
    /// Bind all four listeners under `dir`.
    ///
    /// Must complete before the descriptor naming these points is published,
    /// so that an executor can never dial an address that does not exist yet.
    pub fn bind(dir: &Path) -> Result<Self> {
        let mut guard = RendezvousGuard::new();

        let (out_name, out) = bind_one(dir, ChannelRole::Out, &mut guard)?;
        let (in_name, input) = bind_one(dir, ChannelRole::In, &mut guard)?;
        let (err_name, error) = bind_one(dir, ChannelRole::Err, &mut guard)?;
        let (exit_name, exit) = bind_one(dir, ChannelRole::Exit, &mut guard)?;

        Ok(Self {
            names: ChannelNames {
                out: out_name,
                input: in_name,
                error: err_name,
                exit: exit_name,
            },
            listeners: ChannelListeners {
                out,
                input,
                error,
                exit,
            },
            guard,
        })
    }

    pub fn names(&self) -> &ChannelNames {
        &self.names
    }

    /// Hand out the listeners; the guard keeps owning the socket files.
    pub fn split(self) -> (ChannelNames, ChannelListeners, RendezvousGuard) {
        (self.names, self.listeners, self.guard)
    }
}

fn bind_one(
    dir: &Path,
    role: ChannelRole,
    guard: &mut RendezvousGuard,
) -> Result<(String, UnixListener)> {
    let name = rendezvous_name(role);
    let path = resolve(dir, &name);

    // A failed bind leaves no file behind, and the path may belong to
    // someone else, so only successful binds are registered.
    let listener = UnixListener::bind(&path).map_err(|source| CmdpipeError::Bind {
        role,
        path: path.clone(),
        source,
    })?;
    guard.register(path.clone());

    debug!(%role, path = %path.display(), "listening on rendezvous point");
    Ok((name, listener))
}
