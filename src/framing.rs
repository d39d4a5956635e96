//! Read helpers shared by both decoys.
//!
//! Every read is the single suspension point of a session loop. An optional
//! idle deadline turns a silent peer into [`FrameError::IdleTimeout`].

use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest accepted line, terminator included.
pub const MAX_LINE_LENGTH: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The peer closed its side; a normal end of session.
    #[error("connection closed by peer")]
    Closed,
    #[error("line exceeds {MAX_LINE_LENGTH} bytes")]
    LineTooLong,
    #[error("no data received for {0:?}")]
    IdleTimeout(Duration),
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    pub fn is_closed(&self) -> bool {
        matches!(self, FrameError::Closed)
    }
}

/// Read a single command byte.
pub async fn read_byte<R>(reader: &mut R, idle: Option<Duration>) -> Result<u8, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    with_idle(idle, async {
        match reader.read_u8().await {
            Ok(b) => Ok(b),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FrameError::Closed),
            Err(e) => Err(FrameError::Io(e)),
        }
    })
    .await
}

/// Read one `\n`-terminated line and return it without the `\r\n` / `\n`.
///
/// Non-UTF-8 bytes are decoded lossily. A non-empty line cut short by
/// end-of-stream is returned as is; the following read reports
/// [`FrameError::Closed`].
pub async fn read_line<R>(reader: &mut R, idle: Option<Duration>) -> Result<String, FrameError>
where
    R: AsyncBufRead + Unpin,
{
    with_idle(idle, async {
        let mut buf = Vec::new();
        let n = (&mut *reader)
            .take(MAX_LINE_LENGTH as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Err(FrameError::Closed);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() >= MAX_LINE_LENGTH {
            return Err(FrameError::LineTooLong);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
    .await
}

/// Write a whole reply and flush it. Callers treat failure as best-effort.
pub async fn write_reply<W>(writer: &mut W, reply: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(reply).await?;
    writer.flush().await
}

async fn with_idle<T, F>(idle: Option<Duration>, fut: F) -> Result<T, FrameError>
where
    F: Future<Output = Result<T, FrameError>>,
{
    match idle {
        None => fut.await,
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(FrameError::IdleTimeout(limit))),
    }
}
