// src/status.rs

//! Exit status as carried on the `exit` channel.
//!
//! The executor writes the decimal text of a single integer and closes its
//! side. `-1` means the status could not be determined.

use std::process::ExitStatus;

use tracing::warn;

/// Sentinel for "could not be determined".
pub const UNKNOWN_STATUS: i32 = -1;

/// Exit code used by the `send` process when the status is [`UNKNOWN_STATUS`].
pub const UNKNOWN_PROCESS_EXIT: i32 = 255;

pub fn encode_status(code: i32) -> String {
    code.to_string()
}

/// Parse the bytes read from the `exit` channel.
///
/// Anything that is not a decimal integer is logged and mapped to
/// [`UNKNOWN_STATUS`].
pub fn decode_status(payload: &[u8]) -> i32 {
    let text = String::from_utf8_lossy(payload);
    match text.trim().parse::<i32>() {
        Ok(code) => code,
        Err(err) => {
            warn!(payload = %text, error = %err, "cannot parse exit status");
            UNKNOWN_STATUS
        }
    }
}

/// Translate a child's termination into the wire status.
///
/// Deaths by signal have no code on unix and become [`UNKNOWN_STATUS`].
pub fn status_from_exit(status: ExitStatus) -> i32 {
    status.code().unwrap_or(UNKNOWN_STATUS)
}

/// Map a reported status onto the exit code of the local process.
pub fn process_exit_code(status: i32) -> i32 {
    if status == UNKNOWN_STATUS {
        UNKNOWN_PROCESS_EXIT
    } else {
        status
    }
}
