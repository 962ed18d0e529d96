// src/runner/lines.rs

//! Line reading from runner pipes.
//!
//! Runner output is not guaranteed to be UTF-8 and a line can be arbitrarily
//! long. Lines are read as raw bytes, at most `cap` bytes are kept per line
//! and the remainder is discarded, then converted lossily. The pipe is read
//! until EOF no matter what it contains, so the runner never sees a closed
//! pipe while it is still writing.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use super::output::Stream;

/// One line read from a runner pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeLine {
    pub stream: Stream,
    pub text: String,
    /// Bytes past the per-line cap were dropped.
    pub clipped: bool,
}

/// Read `reader` line by line until EOF and forward each line to `tx`.
pub(crate) fn spawn_line_reader<R>(
    reader: R,
    stream: Stream,
    cap: usize,
    tx: mpsc::UnboundedSender<PipeLine>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            match read_capped_line(&mut reader, &mut buf, cap).await {
                Ok(None) => break,
                Ok(Some(clipped)) => {
                    let line = PipeLine {
                        stream,
                        text: String::from_utf8_lossy(&buf).into_owned(),
                        clipped,
                    };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(?stream, error = %e, "reading runner output failed");
                    break;
                }
            }
        }
    });
}

/// Read one line into `buf` (cleared first), without the line terminator.
///
/// Returns `None` at EOF, otherwise whether the line was clipped to `cap`.
pub async fn read_capped_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    cap: usize,
) -> io::Result<Option<bool>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = u64::try_from(cap).unwrap_or(u64::MAX).saturating_add(1);
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        return Ok(Some(false));
    }

    // No terminator: either EOF on a final partial line, or the cap was hit.
    if buf.len() <= cap {
        return Ok(Some(false));
    }
    buf.truncate(cap);
    skip_rest_of_line(reader).await?;
    Ok(Some(true))
}

async fn skip_rest_of_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if done {
            return Ok(());
        }
    }
}
