use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::http::error::Rejected;
use crate::http::mime;
use crate::http::reader::Frame;
use crate::http::request::{HttpVersion, Request};
use crate::http::status::StatusCode;
use crate::http::writer::ResponseWriter;

const CONTENT_LENGTH: &str = "content-length";
const CONTENT_TYPE: &str = "content-type";

/// A `Set-Cookie` entry. Options are written as `; name=value` in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub options: Vec<(String, String)>,
}

/// Everything that ends up on the wire for one response.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub status_code: u16,
    /// Text after the version on the status line, e.g. `404 Not Found`
    pub status_message: String,
    /// Headers keyed by lowercase name, in insertion order
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<Cookie>,
    pub body: Option<Vec<u8>>,
    pub version: HttpVersion,
    pub should_disconnect: bool,
    pub error: bool,
}

impl ResponseParts {
    fn new(version: HttpVersion, should_disconnect: bool) -> Self {
        Self {
            status_code: StatusCode::Ok.as_u16(),
            status_message: StatusCode::Ok.status_line(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
            version,
            should_disconnect,
            error: false,
        }
    }

    pub fn header(&self, field: &str) -> Option<&str> {
        let field = field.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == field)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_header(&mut self, field: &str, value: String) {
        let field = field.to_ascii_lowercase();
        match self.headers.iter_mut().find(|(k, _)| *k == field) {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((field, value)),
        }
    }
}

/// The response handed to route handlers.
///
/// Sending does not touch the socket directly: the serialized response is
/// queued on the connection's [`ResponseWriter`] and flushed after dispatch.
#[derive(Debug)]
pub struct Response<'w> {
    parts: ResponseParts,
    net: &'w mut ResponseWriter,
}

impl<'w> Response<'w> {
    /// Creates a response for a well-formed request.
    pub fn new(net: &'w mut ResponseWriter, request: &Request) -> Self {
        Self {
            parts: ResponseParts::new(request.version, request.should_disconnect),
            net,
        }
    }

    /// Creates a response for a frame.
    ///
    /// For an error frame the error status is sent right away with an empty
    /// body over HTTP/1.0 and the connection is closed; `Rejected` is returned
    /// so the caller stops handling the request.
    pub fn open(net: &'w mut ResponseWriter, frame: &Frame) -> Result<Self, Rejected> {
        match frame {
            Ok(request) => Ok(Self::new(net, request)),
            Err(error) => {
                let mut response = Self {
                    parts: ResponseParts::new(HttpVersion::Http10, true),
                    net,
                };
                response.parts.error = true;
                response.status(error.status().as_u16()).end();
                Err(Rejected)
            }
        }
    }

    /// Sets the status code and its canonical message.
    ///
    /// Codes outside the table get the bare number as their message.
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.parts.status_code = code;
        self.parts.status_message = match StatusCode::from_u16(code) {
            Some(status) => status.status_line(),
            None => code.to_string(),
        };
        self
    }

    /// Sets the status from text such as `"404"` or `"299 Custom Thing"`.
    ///
    /// The leading number becomes the code. Known codes get their canonical
    /// message; anything else keeps `text` verbatim as the message.
    pub fn status_text(&mut self, text: &str) -> &mut Self {
        let digits: String = text
            .trim_start()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        let code = digits.parse().unwrap_or(0);
        self.parts.status_code = code;
        self.parts.status_message = match StatusCode::from_u16(code) {
            Some(status) => status.status_line(),
            None => text.to_string(),
        };
        self
    }

    /// Gets a header, case-insensitively.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.parts.header(field)
    }

    /// Sets a header. The name is stored lowercase.
    pub fn set(&mut self, field: &str, value: impl ToString) -> &mut Self {
        self.parts.set_header(field, value.to_string());
        self
    }

    pub fn cookie<I, K, V>(&mut self, name: &str, value: &str, options: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parts.cookies.push(Cookie {
            name: name.to_string(),
            value: value.to_string(),
            options: options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
        self
    }

    /// Sends `body` with a matching Content-Length.
    pub fn send(&mut self, body: impl Into<Vec<u8>>) {
        let body = body.into();
        self.set(CONTENT_LENGTH, body.len());
        self.parts.body = Some(body);
        self.net.send_response(&self.parts, self.parts.should_disconnect);
    }

    /// Sends an empty body.
    pub fn end(&mut self) {
        self.set(CONTENT_LENGTH, 0);
        self.parts.body = None;
        self.net.send_response(&self.parts, self.parts.should_disconnect);
    }

    /// Serializes `body` as JSON and sends it.
    ///
    /// Content-Type defaults to `application/json`. A serialization failure
    /// is answered with an empty 500.
    pub fn json<T>(&mut self, body: &T)
    where
        T: Serialize + ?Sized,
    {
        let json = match serde_json::to_vec(body) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize JSON response");
                self.status(StatusCode::InternalServerError.as_u16()).end();
                return;
            }
        };

        if self.get(CONTENT_TYPE).is_none() {
            self.set(CONTENT_TYPE, "application/json");
        }
        self.send(json);
    }

    /// Sends the head, then streams the file at `path` as the body.
    ///
    /// Content-Type is derived from the extension when unset. Content-Length,
    /// when unset, is taken from the file's metadata at write time. An unknown
    /// extension marks the response as an error and sends a bare 415 that
    /// closes the connection.
    pub fn send_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();

        if self.get(CONTENT_TYPE).is_none() {
            match mime::from_path(path) {
                Some(content_type) => {
                    self.set(CONTENT_TYPE, content_type);
                }
                None => {
                    self.parts.error = true;
                    self.status(StatusCode::UnsupportedMediaType.as_u16());
                    self.net.send_response(&self.parts, true);
                    return self;
                }
            }
        }

        self.net
            .send_file(&self.parts, path, self.parts.should_disconnect);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.parts.status_code
    }

    pub fn status_message(&self) -> &str {
        &self.parts.status_message
    }

    pub fn version(&self) -> HttpVersion {
        self.parts.version
    }

    pub fn should_disconnect(&self) -> bool {
        self.parts.should_disconnect
    }

    pub fn is_error(&self) -> bool {
        self.parts.error
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.parts.body.as_deref()
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.parts.cookies
    }

    pub fn parts(&self) -> &ResponseParts {
        &self.parts
    }
}
