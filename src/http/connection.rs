use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::config::ServerConfig;
use crate::http::error::HttpError;
use crate::http::reader::{Frame, FrameReader};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::router::Router;

/// One accepted client connection.
///
/// Owns the framing state, the response queue and the stream; nothing here is
/// shared with other connections.
pub struct Connection<S = TcpStream> {
    stream: S,
    buffer: BytesMut,
    read_size: usize,
    idle_timeout: Duration,
    reader: FrameReader,
    writer: ResponseWriter,
    router: Arc<Router>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Vec<Frame>),
    Writing,
    TimedOut,
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, router: Arc<Router>, settings: &ServerConfig) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(settings.read_buffer_size),
            read_size: settings.read_buffer_size,
            idle_timeout: settings.idle_timeout(),
            reader: FrameReader::with_max_size(settings.max_request_size),
            writer: ResponseWriter::new(),
            router,
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => self.read_chunk().await?,

                ConnectionState::Processing(frames) => {
                    for frame in frames {
                        self.serve(frame);
                    }
                    ConnectionState::Writing
                }

                ConnectionState::Writing => {
                    let closed = self.writer.flush(&mut self.stream).await?;
                    if self.writer.has_sent() {
                        self.reader.mark_response_sent();
                        self.writer.clear_sent();
                    }

                    if closed {
                        ConnectionState::Closed
                    } else {
                        ConnectionState::Reading // go back for next request
                    }
                }

                ConnectionState::TimedOut => {
                    debug!("Connection idle timeout");
                    if self.reader.owes_response() {
                        self.serve(Err(HttpError::NotFound));
                    }
                    if !self.writer.flush(&mut self.stream).await? {
                        if let Err(e) = self.stream.shutdown().await {
                            trace!(error = %e, "Shutdown after timeout failed");
                        }
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => {
                    break;
                }
            };
        }

        Ok(())
    }

    async fn read_chunk(&mut self) -> anyhow::Result<ConnectionState> {
        self.buffer.clear();
        self.buffer.reserve(self.read_size);

        let n = match timeout(self.idle_timeout, self.stream.read_buf(&mut self.buffer)).await {
            Ok(read) => read?,
            Err(_elapsed) => return Ok(ConnectionState::TimedOut),
        };

        if n == 0 {
            // Client closed connection
            return Ok(ConnectionState::Closed);
        }

        let frames = self.reader.feed(&self.buffer[..n]);
        if frames.is_empty() {
            Ok(ConnectionState::Reading)
        } else {
            Ok(ConnectionState::Processing(frames))
        }
    }

    fn serve(&mut self, frame: Frame) {
        match &frame {
            Ok(req) => debug!(method = %req.method, path = %req.path, "Request received"),
            Err(e) => debug!(error = %e, "Request rejected"),
        }

        let Ok(mut response) = Response::open(&mut self.writer, &frame) else {
            return;
        };
        if let Ok(mut request) = frame {
            self.router.dispatch(&mut request, &mut response);
        }
    }
}
