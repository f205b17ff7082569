use crate::context::ConnectionContext;
use crate::context::ConnectionDirective;
use crate::cookie::Cookie;
use crate::headers::Headers;
use crate::status::StatusCode;
use std::borrow::Cow;
use time::macros::format_description;
use time::OffsetDateTime;
use time::UtcOffset;

/// Value of the `Server` header.
pub const SERVER_NAME: &str = concat!("respond/", env!("CARGO_PKG_VERSION"));

/// `Content-Type` used when neither the caller nor the response sets one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

const CRLF: &[u8] = b"\r\n";

/// Formats a timestamp as an HTTP date (IMF-fixdate).
///
/// E.g., `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(date: OffsetDateTime) -> String {
    date.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ))
        .unwrap_or_default()
}

/// The connection-state block of a response head.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectionBlock {
    /// `Keep-Alive: timeout=<timeout>, max=<max>` and `Connection: Keep-Alive`.
    KeepAlive {
        /// Keep-alive timeout in seconds.
        timeout: u64,

        /// Requests still allowed on the connection.
        max: u32,
    },

    /// `Connection: close`.
    Close,
}

impl ConnectionBlock {
    /// Decides whether the connection stays open after a response.
    ///
    /// Only continuable status codes may keep the connection alive, and only
    /// if `directive` asks for it and the connection has both a positive
    /// keep-alive timeout and room for more requests.
    pub fn decide<C>(status: StatusCode, directive: ConnectionDirective, ctx: &C) -> Self
    where
        C: ConnectionContext + ?Sized,
    {
        let timeout = ctx.keep_alive_timeout() / 1000;
        let max = ctx.max_requests();

        if status.is_continuable()
            && directive == ConnectionDirective::KeepAlive
            && timeout > 0
            && max > 0
        {
            ConnectionBlock::KeepAlive { timeout, max }
        } else {
            ConnectionBlock::Close
        }
    }

    /// The directive implied by this block.
    #[inline(always)]
    pub fn directive(self) -> ConnectionDirective {
        match self {
            ConnectionBlock::KeepAlive { .. } => ConnectionDirective::KeepAlive,
            ConnectionBlock::Close => ConnectionDirective::Close,
        }
    }
}

/// Frozen data of a response head.
pub(crate) struct HeadParts<'a> {
    pub version: &'a str,
    pub status: StatusCode,
    pub reason: Option<&'a str>,
    pub date: OffsetDateTime,
    pub content_length: usize,
    pub content_type: Option<&'a str>,
    pub encoding: Option<&'a str>,
    pub connection: ConnectionBlock,
    pub headers: &'a Headers,
    pub cookies: &'a [Cookie],
}

impl<'a> HeadParts<'a> {
    /// The `Content-Type` value to emit, unless the caller's headers carry one.
    fn content_type(&self) -> Option<Cow<'a, str>> {
        if self.headers.get_ignore_case("Content-Type").is_some() {
            return None;
        }

        Some(match (self.content_type, self.encoding) {
            (Some(content_type), _) => Cow::Borrowed(content_type),
            (None, Some(encoding)) => Cow::Owned(format!("text/html;charset={encoding}")),
            (None, None) => Cow::Borrowed(DEFAULT_CONTENT_TYPE),
        })
    }

    /// Writes the head into `buffer`, terminated by an empty line.
    pub(crate) fn write(&self, buffer: &mut Vec<u8>) {
        let reason = self
            .reason
            .unwrap_or_else(|| self.status.canonical_reason());
        let status = self.status.to_string();
        put_line(buffer, &[self.version, " ", status.as_str(), " ", reason]);

        put_header(buffer, "Date", &http_date(self.date));
        put_header(buffer, "Content-Length", &self.content_length.to_string());

        if let Some(content_type) = self.content_type() {
            put_header(buffer, "Content-Type", &content_type);
        }

        match self.connection {
            ConnectionBlock::KeepAlive { timeout, max } => {
                let (timeout, max) = (timeout.to_string(), max.to_string());
                put_line(
                    buffer,
                    &["Keep-Alive: timeout=", timeout.as_str(), ", max=", max.as_str()],
                );
                put_header(buffer, "Connection", "Keep-Alive");
            }
            ConnectionBlock::Close => put_header(buffer, "Connection", "close"),
        }

        for (name, value) in self.headers.iter() {
            if !Headers::is_reserved(name) {
                put_header(buffer, name, value);
            }
        }

        put_header(buffer, "Server", SERVER_NAME);

        for cookie in self.cookies {
            put_header(buffer, "Set-Cookie", &cookie.to_string());
        }

        buffer.extend_from_slice(CRLF);
    }
}

#[inline(always)]
fn put_header(buffer: &mut Vec<u8>, name: &str, value: &str) {
    put_line(buffer, &[name, ": ", value]);
}

fn put_line(buffer: &mut Vec<u8>, pieces: &[&str]) {
    for piece in pieces {
        buffer.extend_from_slice(piece.as_bytes());
    }
    buffer.extend_from_slice(CRLF);
}
