use std::path::Path;

use cmdpipe::channel::resolve;
use cmdpipe::descriptor::CommandDescriptor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

/// What a fake executor does once it has a descriptor.
#[derive(Debug, Clone, Default)]
pub struct PeerScript {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Raw bytes written on the exit channel.
    pub exit: Vec<u8>,
    /// Skip dialing the exit channel entirely.
    pub skip_exit: bool,
}

/// What the fake executor observed.
#[derive(Debug, Clone, Default)]
pub struct PeerReport {
    pub stdin: Vec<u8>,
}

/// Play the executor's half of the handshake without running a program.
pub async fn play_executor(
    dir: &Path,
    descriptor: &CommandDescriptor,
    script: PeerScript,
) -> anyhow::Result<PeerReport> {
    let mut out = UnixStream::connect(resolve(dir, &descriptor.out)).await?;
    let mut input = UnixStream::connect(resolve(dir, &descriptor.input)).await?;
    let mut err = UnixStream::connect(resolve(dir, &descriptor.error)).await?;

    out.write_all(&script.stdout).await?;
    out.shutdown().await?;
    err.write_all(&script.stderr).await?;
    err.shutdown().await?;

    let mut stdin = Vec::new();
    input.read_to_end(&mut stdin).await?;

    if !script.skip_exit {
        let mut exit = UnixStream::connect(resolve(dir, &descriptor.exit)).await?;
        exit.write_all(&script.exit).await?;
        exit.shutdown().await?;
    }

    Ok(PeerReport { stdin })
}
