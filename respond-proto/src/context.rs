use std::fmt;
use time::OffsetDateTime;

/// Identifier of a request on a server, monotonically increasing.
#[derive(Copy, Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestId(u64);

impl RequestId {
    /// New request id.
    #[inline(always)]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the integer value as `u64`.
    #[inline(always)]
    pub const fn into_u64(self) -> u64 {
        self.0
    }

    /// Returns the id following this one.
    #[inline(always)]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for RequestId {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for RequestId {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What happens to the connection once a response is written.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ConnectionDirective {
    /// Read the next request on the same connection.
    #[default]
    KeepAlive,

    /// Close the connection.
    Close,
}

/// Request data copied into the [`Response`](crate::response::Response) it originates.
#[derive(Clone, Debug)]
pub struct RequestMeta {
    /// Request identifier.
    pub id: RequestId,

    /// When the request arrived.
    pub arrived_at: OffsetDateTime,

    /// Protocol version of the request line (e.g., `HTTP/1.1`).
    pub version: String,
}

impl RequestMeta {
    /// Metadata of a request arrived now.
    pub fn new(id: RequestId) -> Self {
        Self {
            id,
            arrived_at: OffsetDateTime::now_utc(),
            version: crate::HTTP_11.to_string(),
        }
    }
}

/// The connection a [`Response`](crate::response::Response) is written to.
///
/// The connection performs the actual socket I/O; the response only pushes
/// byte slices and reports its lifecycle.
pub trait ConnectionContext {
    /// Whether the connection is shutting down.
    fn is_closing(&self) -> bool;

    /// Current keep-alive timeout in milliseconds.
    fn keep_alive_timeout(&self) -> u64;

    /// Updates the keep-alive timeout (milliseconds).
    fn set_keep_alive_timeout(&mut self, millis: u64);

    /// Number of further requests allowed on this connection.
    ///
    /// `0` means no further requests.
    fn max_requests(&self) -> u32;

    /// A response is ready and its transmission begins.
    fn start_send_response(&mut self, request_id: RequestId);

    /// Queues `chunk` for asynchronous transmission.
    ///
    /// Returns `false` if the connection cannot accept it (e.g., broken socket).
    fn send_async_start(&mut self, chunk: &[u8]) -> bool;

    /// Transmission can proceed after a completed head write.
    fn continue_send_response(&mut self);

    /// The response for `request_id` has been fully queued.
    fn end_send_response(&mut self, request_id: RequestId, directive: ConnectionDirective);
}
