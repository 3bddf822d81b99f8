// src/dispatch/env.rs

use tracing::debug;

/// Resolve the propagation list into `KEY=VALUE` entries for the descriptor.
///
/// - `KEY=VALUE` entries are forwarded verbatim.
/// - Bare names are looked up through `lookup` and forwarded as
///   `NAME=value`; unset names are skipped.
pub fn propagated_env<F>(entries: &[String], lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    entries
        .iter()
        .filter_map(|entry| {
            if entry.contains('=') {
                return Some(entry.clone());
            }
            match lookup(entry) {
                Some(value) => Some(format!("{entry}={value}")),
                None => {
                    debug!(name = %entry, "not propagating unset variable");
                    None
                }
            }
        })
        .collect()
}
