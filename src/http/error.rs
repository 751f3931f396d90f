use thiserror::Error;

use crate::http::request::HttpVersion;
use crate::http::status::StatusCode;

/// Failures while decomposing a complete frame into a [`Request`].
///
/// [`Request`]: crate::http::request::Request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("request is not valid utf-8")]
    InvalidEncoding,

    #[error("no blank line between head and body")]
    MissingHeadTerminator,

    #[error("invalid request line")]
    InvalidRequestLine,

    #[error("invalid header line: {line:?}")]
    InvalidHeader { line: String },

    #[error("{name} header field is missing, required by HTTP {version}")]
    MissingRequiredHeader {
        name: &'static str,
        version: HttpVersion,
    },
}

/// Terminal per-request errors produced before any handler runs.
///
/// A frame carrying one of these is answered with its status and an empty
/// body, then the connection is closed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("bad request")]
    BadRequest,

    #[error("request too large")]
    RequestTooLarge,

    #[error("not found")]
    NotFound,

    #[error("internal server error")]
    InternalServerError,

    #[error("unsupported media type")]
    UnsupportedMediaType,
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest => StatusCode::BadRequest,
            HttpError::RequestTooLarge => StatusCode::UriTooLong,
            HttpError::NotFound => StatusCode::NotFound,
            HttpError::InternalServerError => StatusCode::InternalServerError,
            HttpError::UnsupportedMediaType => StatusCode::UnsupportedMediaType,
        }
    }
}

impl From<ParseError> for HttpError {
    fn from(_: ParseError) -> Self {
        HttpError::BadRequest
    }
}

/// Returned when a response was opened for a frame that already carried an
/// error. The error status has been sent; no handler may run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("request was received with error")]
pub struct Rejected;
