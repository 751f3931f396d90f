use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::http::error::ParseError;
use crate::http::mime;
use crate::http::parser;

/// The only protocol name accepted on the request line.
pub const PROTOCOL: &str = "HTTP";

static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_.]+)\s*(:\s*([0-9]+))?").expect("hostname regex should be valid")
});

static BODY_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*([^\s]+)\s*=\s*([^\s]+)\s*").expect("body param regex should be valid")
});

/// HTTP request methods accepted on the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    CONNECT,
    /// OPTION - spelled without the trailing `S` on the wire
    OPTION,
    TRACE,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Example
    ///
    /// ```
    /// # use huji::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "CONNECT" => Some(Method::CONNECT),
            "OPTION" => Some(Method::OPTION),
            "TRACE" => Some(Method::TRACE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::CONNECT => "CONNECT",
            Method::OPTION => "OPTION",
            Method::TRACE => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1.0" => Some(HttpVersion::Http10),
            "1.1" => Some(HttpVersion::Http11),
            _ => None,
        }
    }

    /// Version number as written after `HTTP/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "1.0",
            HttpVersion::Http11 => "1.1",
        }
    }

    /// Lowercase header names a request of this version must carry, in
    /// checking order.
    pub fn required_headers(&self) -> &'static [&'static str] {
        match self {
            HttpVersion::Http10 => &[],
            HttpVersion::Http11 => &["host"],
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed HTTP request.
///
/// Built once per completed frame. Only `params` changes afterwards, when the
/// router matches a route.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Always [`PROTOCOL`].
    pub protocol: &'static str,
    pub version: HttpVersion,
    /// Request path, without the query string
    pub path: String,
    /// Decoded query string parameters
    pub query: HashMap<String, String>,
    /// Headers keyed by lowercase name; repeated lines are joined with `,`
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    /// Route parameters, filled in by the router per match
    pub params: HashMap<String, String>,
    /// Raw body text, `None` when empty
    pub body: Option<String>,
    /// Body parsed as JSON, or as `key=value` pairs joined by `&`
    pub body_params: Value,
    /// Host header without its port
    pub host: Option<String>,
    /// Whether the connection closes after the response
    pub should_disconnect: bool,
}

/// Builder for constructing Request objects.
///
/// `build` derives query, cookies, host, body parameters and the close
/// decision exactly as parsing a frame does.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Option<HttpVersion>,
    headers: HashMap<String, String>,
    body: String,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Request target; anything after the first `?` becomes the query.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: HttpVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Adds a header. Repeated names are joined with `,` in call order.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers
            .entry(key.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<Request, ParseError> {
        let method = self.method.ok_or(ParseError::InvalidRequestLine)?;
        let target = self.target.ok_or(ParseError::InvalidRequestLine)?;
        let version = self.version.unwrap_or(HttpVersion::Http11);

        for &name in version.required_headers() {
            if !self.headers.contains_key(name) {
                return Err(ParseError::MissingRequiredHeader { name, version });
            }
        }

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (target, HashMap::new()),
        };

        let cookies = self
            .headers
            .get("cookie")
            .map(|raw| parse_cookies(raw))
            .unwrap_or_default();
        let host = self.headers.get("host").map(|raw| parse_host(raw));
        let should_disconnect = should_disconnect(&self.headers);

        let (body, body_params) = if self.body.is_empty() {
            (None, Value::Object(Map::new()))
        } else {
            let params = parse_body_params(&self.body);
            (Some(self.body), params)
        };

        Ok(Request {
            method,
            protocol: PROTOCOL,
            version,
            path,
            query,
            headers: self.headers,
            cookies,
            params: HashMap::new(),
            body,
            body_params,
            host,
            should_disconnect,
        })
    }
}

impl Request {
    /// Builds a request from the head lines of a frame and its body text.
    ///
    /// The first line must be a request line and every other line a header
    /// line. Fails when a header required by the request's version is absent.
    pub fn from_head(head: &[&str], body: &str) -> Result<Self, ParseError> {
        let (first, header_lines) = head.split_first().ok_or(ParseError::InvalidRequestLine)?;
        let line = parser::request_line(first).ok_or(ParseError::InvalidRequestLine)?;

        let mut builder = RequestBuilder::new()
            .method(line.method)
            .target(line.target)
            .version(line.version)
            .body(body);

        for raw in header_lines {
            let header = parser::header_line(raw).ok_or_else(|| ParseError::InvalidHeader {
                line: raw.to_string(),
            })?;
            builder = builder.header(header.name, header.value);
        }

        builder.build()
    }

    /// Retrieves a header value by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Parses the Content-Length header. Returns 0 if missing or invalid.
    pub fn content_length(&self) -> usize {
        self.get("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Checks whether the Content-Type header matches `kind`.
    ///
    /// `kind` may be a full MIME type, a wildcard such as `text/*`, or a bare
    /// extension like `json`.
    pub fn is(&self, kind: &str) -> bool {
        let Some(content_type) = self.get("content-type") else {
            return false;
        };
        let expected = if kind.contains('/') {
            kind
        } else {
            match mime::from_extension(kind) {
                Some(mime) => mime,
                None => return false,
            }
        };
        let actual = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        mime_matches(&expected.to_ascii_lowercase(), &actual)
    }

    /// Looks a parameter up in route params, then body params, then the query.
    pub fn param(&self, name: &str) -> Option<String> {
        if let Some(value) = self.params.get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self.body_params.get(name) {
            return Some(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        }
        self.query.get(name).cloned()
    }
}

fn mime_matches(expected: &str, actual: &str) -> bool {
    let (Some((want_type, want_sub)), Some((got_type, got_sub))) =
        (expected.split_once('/'), actual.split_once('/'))
    else {
        return false;
    };
    (want_type == "*" || want_type == got_type) && (want_sub == "*" || want_sub == got_sub)
}

// HTTP/1.1 closes by default too: only an explicit `keep-alive` keeps the
// connection open.
fn should_disconnect(headers: &HashMap<String, String>) -> bool {
    match headers.get("connection").map(String::as_str) {
        None => true,
        Some("close") => true,
        Some("keep-alive") => false,
        Some(_) => true,
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn parse_host(raw: &str) -> String {
    HOSTNAME
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| raw.to_string(), |m| m.as_str().to_string())
}

fn parse_cookies(raw: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for segment in raw.split(';') {
        let Some((name, value)) = segment.trim().split_once('=') else {
            continue;
        };
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        cookies
            .entry(name.trim().to_string())
            .or_insert_with(|| value.to_string());
    }
    cookies
}

fn parse_body_params(body: &str) -> Value {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        return json;
    }

    let mut params = Map::new();
    for segment in body.split('&').filter(|s| !s.is_empty()) {
        if let Some(caps) = BODY_PARAM.captures(segment) {
            params.insert(caps[1].to_string(), Value::String(caps[2].to_string()));
        }
    }
    Value::Object(params)
}
