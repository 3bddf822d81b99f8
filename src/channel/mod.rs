// src/channel/mod.rs

//! The per-invocation channel set.
//!
//! Four unix-socket rendezvous points carry stdout, stdin, stderr and the
//! exit status of one remote invocation. The dispatcher always listens and
//! owns the socket files; the executor always dials.
//!
//! - [`naming`] generates `cmdpipe-<suffix>-<role>` names and resolves them
//!   against the rendezvous directory.
//! - [`set`] binds the four listeners and removes the socket files again.
//! - [`relay`] accepts single connections and pumps bytes between them and
//!   local handles.

use std::fmt;

pub mod naming;
pub mod relay;
pub mod set;

pub use naming::{rendezvous_name, resolve};
pub use relay::{RelayReport, StatusReport};
pub use set::{ChannelListeners, ChannelNames, ChannelSet, RendezvousGuard};

/// Which stream a rendezvous point carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Out,
    In,
    Err,
    Exit,
}

impl ChannelRole {
    /// All roles in executor dial order.
    pub const ALL: [ChannelRole; 4] = [
        ChannelRole::Out,
        ChannelRole::In,
        ChannelRole::Err,
        ChannelRole::Exit,
    ];

    /// Suffix used in the rendezvous file name.
    pub fn tag(self) -> &'static str {
        match self {
            ChannelRole::Out => "out",
            ChannelRole::In => "in",
            ChannelRole::Err => "err",
            ChannelRole::Exit => "exit",
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
