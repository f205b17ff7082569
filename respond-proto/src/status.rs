use std::fmt;
use std::str::FromStr;

/// Error for a status code outside `100..=999`.
#[derive(Debug)]
pub struct InvalidStatusCode;

/// HTTP response status code.
#[derive(Copy, Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 100 Continue.
    pub const CONTINUE: StatusCode = StatusCode(100);

    /// 200 OK.
    pub const OK: StatusCode = StatusCode(200);

    /// 201 Created.
    pub const CREATED: StatusCode = StatusCode(201);

    /// 202 Accepted.
    pub const ACCEPTED: StatusCode = StatusCode(202);

    /// 204 No Content.
    pub const NO_CONTENT: StatusCode = StatusCode(204);

    /// 206 Partial Content.
    pub const PARTIAL_CONTENT: StatusCode = StatusCode(206);

    /// 301 Moved Permanently.
    pub const MOVED_PERMANENTLY: StatusCode = StatusCode(301);

    /// 302 Found.
    pub const FOUND: StatusCode = StatusCode(302);

    /// 304 Not Modified.
    pub const NOT_MODIFIED: StatusCode = StatusCode(304);

    /// 400 Bad Request.
    pub const BAD_REQUEST: StatusCode = StatusCode(400);

    /// 403 Forbidden.
    pub const FORBIDDEN: StatusCode = StatusCode(403);

    /// 404 Not Found.
    pub const NOT_FOUND: StatusCode = StatusCode(404);

    /// 500 Internal Server Error.
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// 503 Service Unavailable.
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    /// Tries to construct a [`StatusCode`] from `u16`.
    #[inline(always)]
    pub const fn from_u16(value: u16) -> Result<Self, InvalidStatusCode> {
        if value >= 100 && value <= 999 {
            Ok(Self(value))
        } else {
            Err(InvalidStatusCode)
        }
    }

    /// Returns the integer value as `u16`.
    #[inline(always)]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Whether a connection may be kept open after a response with this code.
    ///
    /// Any other code always closes the connection.
    #[inline(always)]
    pub const fn is_continuable(self) -> bool {
        matches!(self.0, 100 | 200 | 202 | 206 | 302)
    }

    /// Returns the canonical reason phrase, or `"Unknown"`.
    pub const fn canonical_reason(self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Payload Too Large",
            414 => "URI Too Long",
            415 => "Unsupported Media Type",
            416 => "Range Not Satisfiable",
            417 => "Expectation Failed",
            426 => "Upgrade Required",
            429 => "Too Many Requests",
            431 => "Request Header Fields Too Large",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",
            _ => "Unknown",
        }
    }
}

impl Default for StatusCode {
    #[inline(always)]
    fn default() -> Self {
        Self::OK
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = InvalidStatusCode;

    #[inline(always)]
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_u16(value)
    }
}

impl From<StatusCode> for u16 {
    #[inline(always)]
    fn from(value: StatusCode) -> Self {
        value.0
    }
}

impl FromStr for StatusCode {
    type Err = InvalidStatusCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.parse::<u16>().map_err(|_| InvalidStatusCode)?;
        Self::from_u16(value)
    }
}

impl fmt::Debug for StatusCode {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for StatusCode {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
