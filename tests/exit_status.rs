// tests/exit_status.rs

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use cmdpipe::status::{
    UNKNOWN_PROCESS_EXIT, UNKNOWN_STATUS, decode_status, encode_status, process_exit_code,
    status_from_exit,
};

#[test]
fn decodes_decimal_text() {
    assert_eq!(decode_status(b"0"), 0);
    assert_eq!(decode_status(b"1"), 1);
    assert_eq!(decode_status(b"255"), 255);
    assert_eq!(decode_status(b"-1"), UNKNOWN_STATUS);
    assert_eq!(decode_status(encode_status(42).as_bytes()), 42);
}

#[test]
fn garbage_and_empty_payloads_become_unknown() {
    assert_eq!(decode_status(b""), UNKNOWN_STATUS);
    assert_eq!(decode_status(b"abc"), UNKNOWN_STATUS);
    assert_eq!(decode_status(b"1.5"), UNKNOWN_STATUS);
    assert_eq!(decode_status(&[0xff, 0xfe]), UNKNOWN_STATUS);
}

#[test]
fn signal_deaths_have_no_code() {
    // Raw wait status: exited with code 3.
    assert_eq!(status_from_exit(ExitStatus::from_raw(3 << 8)), 3);
    // Raw wait status: killed by SIGKILL.
    assert_eq!(status_from_exit(ExitStatus::from_raw(9)), UNKNOWN_STATUS);
}

#[test]
fn unknown_status_maps_to_sentinel_exit_code() {
    assert_eq!(process_exit_code(0), 0);
    assert_eq!(process_exit_code(7), 7);
    assert_eq!(process_exit_code(UNKNOWN_STATUS), UNKNOWN_PROCESS_EXIT);
}
