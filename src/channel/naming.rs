// src/channel/naming.rs

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distributions::Alphanumeric;

use super::ChannelRole;

/// Length of the random part of a rendezvous name.
pub const SUFFIX_LEN: usize = 6;

const PREFIX: &str = "cmdpipe";

/// Fresh rendezvous name for `role`, e.g. `cmdpipe-x7Qa0b-out`.
///
/// Uniqueness only; collisions are not retried.
pub fn rendezvous_name(role: ChannelRole) -> String {
    format!("{PREFIX}-{}-{}", random_suffix(SUFFIX_LEN), role.tag())
}

pub fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Join a rendezvous name onto the rendezvous directory.
pub fn resolve(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
