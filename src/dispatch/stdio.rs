// src/dispatch/stdio.rs

use std::io::IsTerminal;

use tokio::io::{AsyncRead, AsyncWrite};

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The local handles a dispatch relays against.
///
/// `stdin` is `None` when there is nothing to forward, e.g. when standard
/// input is an interactive terminal.
pub struct LocalStdio {
    pub stdin: Option<BoxedReader>,
    pub stdout: BoxedWriter,
    pub stderr: BoxedWriter,
}

impl LocalStdio {
    /// This process's own standard handles.
    pub fn inherit() -> Self {
        let stdin: Option<BoxedReader> = if std::io::stdin().is_terminal() {
            None
        } else {
            Some(Box::new(tokio::io::stdin()))
        };

        Self {
            stdin,
            stdout: Box::new(tokio::io::stdout()),
            stderr: Box::new(tokio::io::stderr()),
        }
    }
}
