/// HTTP status codes the server surfaces on its own.
///
/// - `Ok` (200): Request successful
/// - `BadRequest` (400): Malformed request or missing required header
/// - `Forbidden` (403): Access denied
/// - `NotFound` (404): No route matched, or the request went unanswered
/// - `UriTooLong` (414): Buffered request exceeded the size limit
/// - `UnsupportedMediaType` (415): File extension has no known MIME type
/// - `InternalServerError` (500): Handler or serialization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 414 URI Too Long
    UriTooLong,
    /// 415 Unsupported Media Type
    UnsupportedMediaType,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use huji::http::status::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::UriTooLong.as_u16(), 414);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::UriTooLong => 414,
            StatusCode::UnsupportedMediaType => 415,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Looks a numeric code up in the fixed table.
    ///
    /// Returns `None` for codes the server has no canonical message for.
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(StatusCode::Ok),
            400 => Some(StatusCode::BadRequest),
            403 => Some(StatusCode::Forbidden),
            404 => Some(StatusCode::NotFound),
            414 => Some(StatusCode::UriTooLong),
            415 => Some(StatusCode::UnsupportedMediaType),
            500 => Some(StatusCode::InternalServerError),
            _ => None,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use huji::http::status::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::UriTooLong => "URI Too Long",
            StatusCode::UnsupportedMediaType => "Unsupported Media Type",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// The status text placed after the version on the wire, e.g. `404 Not Found`.
    pub fn status_line(&self) -> String {
        format!("{} {}", self.as_u16(), self.reason_phrase())
    }

    /// Whether sending this status always closes the connection.
    pub fn forces_close(&self) -> bool {
        matches!(
            self,
            StatusCode::NotFound
                | StatusCode::UnsupportedMediaType
                | StatusCode::Forbidden
                | StatusCode::InternalServerError
                | StatusCode::UriTooLong
        )
    }
}

/// Same as [`StatusCode::forces_close`] for a raw numeric code.
pub fn forces_close(code: u16) -> bool {
    StatusCode::from_u16(code).is_some_and(|s| s.forces_close())
}
