//! Request grammar.
//!
//! Every rule is a pure function over its input. The compiled patterns are
//! immutable statics, so nothing here carries state between calls.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::http::error::ParseError;
use crate::http::request::{HttpVersion, Method, Request};

static REQUEST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(GET|HEAD|POST|PUT|DELETE|CONNECT|OPTION|TRACE) (.*) HTTP/(1\.0|1\.1)$")
        .expect("request line regex should be valid")
});

static HEADER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\s:]+)\s*:\s*(.*)$").expect("header line regex should be valid")
});

static CONTENT_LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Content-Length:\s+([0-9]+)\s+").expect("content length regex should be valid")
});

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n").expect("line break regex should be valid"));

static HEAD_TERMINATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n\r?\n").expect("head terminator regex should be valid"));

/// A matched request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: Method,
    /// Raw request target, path and query together.
    pub target: &'a str,
    pub version: HttpVersion,
}

/// A matched header line. The name keeps its original case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// Tests a line (without its line ending) against the request-line grammar.
pub fn request_line(line: &str) -> Option<RequestLine<'_>> {
    let caps = REQUEST_LINE.captures(line)?;
    Some(RequestLine {
        method: Method::from_str(caps.get(1)?.as_str())?,
        target: caps.get(2)?.as_str(),
        version: HttpVersion::from_str(caps.get(3)?.as_str())?,
    })
}

/// Tests a line (without its line ending) against the header-line grammar.
pub fn header_line(line: &str) -> Option<HeaderLine<'_>> {
    let caps = HEADER_LINE.captures(line)?;
    Some(HeaderLine {
        name: caps.get(1)?.as_str(),
        value: caps.get(2)?.as_str(),
    })
}

/// Extracts the body length from a raw header line, line ending included.
///
/// The match is case-sensitive and needs whitespace on both sides of the
/// number, which the trailing line ending provides.
pub fn content_length(raw_line: &str) -> Option<usize> {
    CONTENT_LENGTH
        .captures(raw_line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Cuts a line at its first line ending, bare or carriage-return-prefixed.
pub fn strip_line_ending(line: &str) -> &str {
    match LINE_BREAK.find(line) {
        Some(m) => &line[..m.start()],
        None => line,
    }
}

/// Splits a full message into head lines and the verbatim body text.
pub fn split_message(text: &str) -> Option<(Vec<&str>, &str)> {
    let terminator = HEAD_TERMINATOR.find(text)?;
    let head = LINE_BREAK.split(&text[..terminator.start()]).collect();
    Some((head, &text[terminator.end()..]))
}

/// Parses one complete frame into a [`Request`].
pub fn parse_http_request(text: &str) -> Result<Request, ParseError> {
    let (head, body) = split_message(text).ok_or(ParseError::MissingHeadTerminator)?;
    Request::from_head(&head, body)
}
