// src/execute/process.rs

//! Runs the requested program with its stdio wired to the dialed channels.

use std::os::fd::OwnedFd;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::net::UnixStream;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::descriptor::CommandDescriptor;
use crate::status::{UNKNOWN_STATUS, status_from_exit};

/// Stdio handles for the child. `None` becomes `/dev/null`.
#[derive(Debug, Default)]
pub struct ProgramStdio {
    pub stdout: Option<UnixStream>,
    pub stdin: Option<UnixStream>,
    pub stderr: Option<UnixStream>,
}

/// Run `program` with the descriptor's params and env and wait for it.
///
/// Returns the exit code, or `-1` if the program could not be started or
/// was terminated without one (e.g. by a signal).
pub async fn run_program(program: &str, descriptor: &CommandDescriptor, stdio: ProgramStdio) -> i32 {
    match run_program_inner(program, descriptor, stdio).await {
        Ok(code) => code,
        Err(err) => {
            error!(program = %program, error = %format!("{err:#}"), "program execution error");
            UNKNOWN_STATUS
        }
    }
}

async fn run_program_inner(
    program: &str,
    descriptor: &CommandDescriptor,
    stdio: ProgramStdio,
) -> Result<i32> {
    info!(program = %program, params = ?descriptor.params, "starting program");

    let mut child = {
        let mut cmd = Command::new(program);
        cmd.args(&descriptor.params)
            .stdout(into_stdio(stdio.stdout)?)
            .stdin(into_stdio(stdio.stdin)?)
            .stderr(into_stdio(stdio.stderr)?)
            .kill_on_drop(true);

        for entry in &descriptor.env {
            match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    cmd.env(key, value);
                }
                _ => warn!(entry = %entry, "ignoring malformed env entry"),
            }
        }

        cmd.spawn()
            .with_context(|| format!("spawning program '{program}'"))?
        // `cmd` drops here and with it our copies of the socket fds, so the
        // dispatcher sees EOF as soon as the child closes its side.
    };

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for program '{program}'"))?;

    let code = status_from_exit(status);
    info!(
        program = %program,
        exit_code = code,
        success = status.success(),
        "program exited"
    );

    Ok(code)
}

/// Hand a connected socket to the child as a blocking fd.
fn into_stdio(stream: Option<UnixStream>) -> Result<Stdio> {
    let Some(stream) = stream else {
        return Ok(Stdio::null());
    };
    let stream = stream.into_std().context("detaching channel from runtime")?;
    stream
        .set_nonblocking(false)
        .context("switching channel to blocking mode")?;
    Ok(Stdio::from(OwnedFd::from(stream)))
}
