use std::io::Cursor;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use cmdpipe::dispatch::LocalStdio;
use tokio::io::AsyncWrite;

/// An `AsyncWrite` that appends into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Local stdio for a dispatcher under test, with stdout and stderr captured.
pub struct CapturedStdio {
    pub stdout: SharedBuffer,
    pub stderr: SharedBuffer,
}

impl CapturedStdio {
    /// `stdin = None` behaves like an interactive terminal.
    pub fn new(stdin: Option<&[u8]>) -> (Self, LocalStdio) {
        let stdout = SharedBuffer::new();
        let stderr = SharedBuffer::new();

        let stdio = LocalStdio {
            stdin: stdin.map(|bytes| {
                Box::new(Cursor::new(bytes.to_vec())) as cmdpipe::dispatch::stdio::BoxedReader
            }),
            stdout: Box::new(stdout.clone()),
            stderr: Box::new(stderr.clone()),
        };

        (Self { stdout, stderr }, stdio)
    }
}
