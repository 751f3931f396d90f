use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::http::response::ResponseParts;
use crate::http::status;

const LINE_BREAK: &[u8] = b"\r\n";
const CONTENT_LENGTH: &str = "content-length";

/// Renders a response to wire bytes.
pub fn serialize_response(resp: &ResponseParts) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!("HTTP/{} {}\r\n", resp.version, resp.status_message);
    buf.extend_from_slice(status_line.as_bytes());

    // Headers, in insertion order
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(LINE_BREAK);
    }

    for cookie in &resp.cookies {
        buf.extend_from_slice(b"Set-Cookie: ");
        buf.extend_from_slice(cookie.name.as_bytes());
        buf.push(b'=');
        buf.extend_from_slice(cookie.value.as_bytes());
        for (option, value) in &cookie.options {
            buf.extend_from_slice(format!("; {option}={value}").as_bytes());
        }
        buf.extend_from_slice(LINE_BREAK);
    }

    // Header/body separator
    buf.extend_from_slice(LINE_BREAK);

    if let Some(body) = &resp.body {
        buf.extend_from_slice(body);
    }

    buf
}

#[derive(Debug)]
enum Outgoing {
    Data(Bytes),
    /// Head written just before streaming, so a missing Content-Length can
    /// still be filled from file metadata.
    File {
        head: Box<ResponseParts>,
        path: PathBuf,
    },
    Close,
}

/// Connection-side sink for responses.
///
/// Responses are queued synchronously while handlers run and written out by
/// [`flush`](Self::flush) once the dispatch turn is over. After a close has
/// been queued the writer stops accepting anything else.
#[derive(Debug)]
pub struct ResponseWriter {
    outbox: VecDeque<Outgoing>,
    writable: bool,
    sent: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            outbox: VecDeque::new(),
            writable: true,
            sent: false,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether a response was sent since the last [`clear_sent`](Self::clear_sent).
    pub fn has_sent(&self) -> bool {
        self.sent
    }

    pub fn clear_sent(&mut self) {
        self.sent = false;
    }

    /// Queues a serialized response.
    ///
    /// Ignored when the connection is no longer writable. Error responses
    /// always close; otherwise the connection closes when asked to or when
    /// the status is in the disconnect-forcing set.
    pub fn send_response(&mut self, response: &ResponseParts, should_disconnect: bool) {
        if !self.writable {
            trace!("Dropping response for closed connection");
            return;
        }

        self.outbox
            .push_back(Outgoing::Data(Bytes::from(serialize_response(response))));
        if closes_after(response, should_disconnect) {
            self.close();
        }
        self.sent = true;
    }

    /// Queues `head` followed by the contents of the file at `path`.
    ///
    /// The stream never closes the connection by itself; the close, if
    /// requested, follows once the file has been copied. A head whose status
    /// forces a close is sent alone.
    pub fn send_file(
        &mut self,
        head: &ResponseParts,
        path: impl Into<PathBuf>,
        should_disconnect: bool,
    ) {
        if !self.writable {
            trace!("Dropping file response for closed connection");
            return;
        }
        if closes_after(head, false) {
            self.send_response(head, false);
            return;
        }

        self.outbox.push_back(Outgoing::File {
            head: Box::new(head.clone()),
            path: path.into(),
        });
        if should_disconnect {
            self.close();
        }
        self.sent = true;
    }

    fn close(&mut self) {
        self.outbox.push_back(Outgoing::Close);
        self.writable = false;
    }

    /// Writes everything queued so far.
    ///
    /// Returns `true` once the connection has been shut down.
    pub async fn flush<W>(&mut self, stream: &mut W) -> anyhow::Result<bool>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(item) = self.outbox.pop_front() {
            match item {
                Outgoing::Data(bytes) => {
                    stream.write_all(&bytes).await?;
                }
                Outgoing::File { mut head, path } => {
                    if head.header(CONTENT_LENGTH).is_none() {
                        if let Ok(meta) = tokio::fs::metadata(&path).await {
                            head.set_header(CONTENT_LENGTH, meta.len().to_string());
                        }
                    }
                    stream.write_all(&serialize_response(&head)).await?;

                    // Errors while streaming a file are not reported to the client.
                    if let Err(e) = stream_file(&path, stream).await {
                        debug!(path = %path.display(), error = %e, "File stream failed");
                    }
                }
                Outgoing::Close => {
                    stream.flush().await?;
                    if let Err(e) = stream.shutdown().await {
                        trace!(error = %e, "Shutdown failed");
                    }
                    self.outbox.clear();
                    return Ok(true);
                }
            }
        }

        stream.flush().await?;
        Ok(false)
    }
}

fn closes_after(response: &ResponseParts, should_disconnect: bool) -> bool {
    response.error || should_disconnect || status::forces_close(response.status_code)
}

async fn stream_file<W>(path: &Path, stream: &mut W) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut file = tokio::fs::File::open(path).await?;
    tokio::io::copy(&mut file, stream).await
}
