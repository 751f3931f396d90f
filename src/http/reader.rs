//! Incremental request framing.
//!
//! Bytes are scanned one at a time. Complete lines are checked against the
//! request grammar while the head is being read; once the blank line is seen,
//! exactly `Content-Length` body bytes are collected and the whole frame is
//! handed to the parser.

use tracing::{debug, warn};

use crate::http::error::HttpError;
use crate::http::parser;
use crate::http::request::Request;

/// Largest line, chunk, or accumulated request accepted before a chunk is
/// processed.
pub const MAX_REQUEST_SIZE: usize = 8194;

/// Outcome of one framing cycle.
pub type Frame = Result<Request, HttpError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ReadingHeaders,
    ReadingBody,
}

/// Per-connection framing state.
#[derive(Debug)]
pub struct FrameReader {
    phase: Phase,
    line: Vec<u8>,
    request: Vec<u8>,
    body_length: usize,
    max_size: usize,
    received_request: bool,
    response_sent: bool,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self::with_max_size(MAX_REQUEST_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            phase: Phase::Idle,
            line: Vec::with_capacity(256),
            request: Vec::with_capacity(1024),
            body_length: 0,
            max_size,
            received_request: false,
            response_sent: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drops any partially read request.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.line.clear();
        self.request.clear();
        self.body_length = 0;
    }

    /// True when a request was delivered by the last chunk and no response
    /// has been recorded since.
    pub fn owes_response(&self) -> bool {
        self.received_request && !self.response_sent
    }

    pub fn mark_response_sent(&mut self) {
        self.response_sent = true;
    }

    /// Consumes one chunk and returns the frames it completed, in order.
    ///
    /// An oversized chunk or buffer yields a single `RequestTooLarge` frame
    /// and drops everything buffered so far.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.received_request = false;
        self.response_sent = false;

        let mut frames = Vec::new();

        if self.line.len() > self.max_size
            || chunk.len() > self.max_size
            || self.request.len() > self.max_size
        {
            warn!(
                chunk = chunk.len(),
                buffered = self.request.len() + self.line.len(),
                limit = self.max_size,
                "Request exceeds size limit"
            );
            self.reset();
            frames.push(Err(HttpError::RequestTooLarge));
            return frames;
        }

        for &byte in chunk {
            self.line.push(byte);

            if self.phase != Phase::ReadingBody && byte == b'\n' {
                self.end_of_line();
            }

            if self.phase == Phase::ReadingBody && self.line.len() == self.body_length {
                frames.push(self.complete());
            }
        }

        frames
    }

    fn end_of_line(&mut self) {
        let raw = String::from_utf8_lossy(&self.line).into_owned();
        let text = parser::strip_line_ending(&raw);

        if text.is_empty() {
            if self.phase == Phase::ReadingHeaders {
                self.request.extend_from_slice(&self.line);
                self.phase = Phase::ReadingBody;
            }
            self.line.clear();
        } else if parser::request_line(text).is_some() {
            self.request.clear();
            self.request.extend_from_slice(text.as_bytes());
            self.request.push(b'\n');
            self.body_length = 0;
            self.phase = Phase::ReadingHeaders;
            self.line.clear();
        } else if self.phase == Phase::ReadingHeaders && parser::header_line(text).is_some() {
            self.request.extend_from_slice(&self.line);
            if let Some(length) = parser::content_length(&raw) {
                self.body_length = length;
            }
            self.line.clear();
        } else {
            debug!(line = %text, "Malformed line, dropping partial request");
            self.reset();
        }
    }

    fn complete(&mut self) -> Frame {
        self.request.extend_from_slice(&self.line);

        let frame = match std::str::from_utf8(&self.request) {
            Ok(text) => parser::parse_http_request(text).map_err(|e| {
                debug!(error = %e, "Rejecting request");
                HttpError::from(e)
            }),
            Err(_) => Err(HttpError::BadRequest),
        };

        self.received_request = true;
        self.reset();
        frame
    }
}
