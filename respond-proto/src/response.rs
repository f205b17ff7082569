use crate::context::ConnectionContext;
use crate::context::ConnectionDirective;
use crate::context::RequestId;
use crate::context::RequestMeta;
use crate::cookie::Cookie;
use crate::error::ResponseError;
use crate::head::ConnectionBlock;
use crate::head::HeadParts;
use crate::headers::Headers;
use crate::payload::Payload;
use crate::payload::RawWindow;
use crate::pool::BufferPool;
use crate::pool::PooledBuffer;
use crate::status::StatusCode;
use bytes::Bytes;
use bytes::BytesMut;
use std::mem;
use time::OffsetDateTime;

/// A raw payload is copied into the head buffer if the total stays below this size.
pub const COALESCE_THRESHOLD: usize = 8 * 1024;

/// Upper bound of [`Response::keep_alive`], in seconds.
pub const MAX_KEEP_ALIVE: u32 = 400;

/// Default of [`Response::keep_alive`], in seconds.
pub const DEFAULT_KEEP_ALIVE: u32 = 5;

/// Result of [`Response::send`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SendOutcome {
    /// Nothing was sent: the connection is closing or the raw window is out of range.
    Skipped,

    /// Transmission started: drive it with [`Response::step`].
    Started,
}

/// Result of a transmission step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Step {
    /// More work may remain.
    Continue,

    /// Everything has been queued and the connection has been notified.
    Done,

    /// The connection refused a chunk. Resources are released; stop stepping.
    Aborted,
}

enum HeadState {
    Open,
    Pending(PooledBuffer),
    InFlight(PooledBuffer),
    Released,
}

/// An HTTP/1.x response.
///
/// Head fields are mutable until [`Response::send`]; afterwards the head is
/// a frozen byte sequence and the response is transmitted with
/// [`Response::step`] and [`Response::complete_head`].
pub struct Response {
    version: String,
    status: StatusCode,
    reason: Option<String>,
    headers: Headers,
    cookies: Vec<Cookie>,
    content_type: Option<String>,
    encoding: Option<String>,
    content_length: Option<u64>,
    keep_alive: u32,
    directive: ConnectionDirective,
    request_id: RequestId,
    arrived_at: OffsetDateTime,
    priority: u8,
    head: HeadState,
    payload: Payload,
    sent: bool,
    aborted: bool,
    pool: BufferPool,
}

impl Response {
    /// Creates an empty `200 OK` response to a request.
    ///
    /// The head buffer is rented from the [global pool](BufferPool::global).
    pub fn new(request: &RequestMeta) -> Self {
        Self::with_pool(request, BufferPool::global().clone())
    }

    /// Creates an empty `200 OK` response renting its head buffer from `pool`.
    pub fn with_pool(request: &RequestMeta, pool: BufferPool) -> Self {
        Self {
            version: request.version.clone(),
            status: StatusCode::OK,
            reason: None,
            headers: Headers::new(),
            cookies: Vec::new(),
            content_type: None,
            encoding: None,
            content_length: None,
            keep_alive: DEFAULT_KEEP_ALIVE,
            directive: ConnectionDirective::KeepAlive,
            request_id: request.id,
            arrived_at: request.arrived_at,
            priority: 0,
            head: HeadState::Open,
            payload: Payload::Empty,
            sent: false,
            aborted: false,
            pool,
        }
    }

    /// Creates a response for an internally generated error.
    ///
    /// The body is a short HTML page and the connection is closed afterwards.
    pub fn error_page(request: &RequestMeta, status: StatusCode) -> Self {
        let mut response = Self::new(request);
        let page = format!(
            "<html><head><title>{status} {reason}</title></head>\
             <body><h1>{status} {reason}</h1></body></html>",
            reason = status.canonical_reason(),
        );

        response.status = status;
        response.directive = ConnectionDirective::Close;
        response.payload = Payload::Body(BytesMut::from(page.as_bytes()));
        response
    }

    /// Protocol version of the status line.
    #[inline(always)]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Sets the protocol version of the status line.
    pub fn set_version<V>(&mut self, version: V) -> Result<(), ResponseError>
    where
        V: Into<String>,
    {
        self.ensure_open()?;
        self.version = version.into();
        Ok(())
    }

    /// Returns the status code.
    #[inline(always)]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        self.ensure_open()?;
        self.status = status;
        Ok(())
    }

    /// Returns the reason phrase: the custom one, or the canonical text of the status.
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .unwrap_or_else(|| self.status.canonical_reason())
    }

    /// Sets a custom reason phrase.
    pub fn set_reason<R>(&mut self, reason: R) -> Result<(), ResponseError>
    where
        R: Into<String>,
    {
        self.ensure_open()?;
        self.reason = Some(reason.into());
        Ok(())
    }

    /// Headers added by the caller.
    ///
    /// Empty once the head has been composed.
    #[inline(always)]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Adds a header. A previous value with the same name is replaced.
    ///
    /// Values spanning several lines must use `\r\n` followed by whitespace.
    pub fn add_header<K, V>(&mut self, name: K, value: V) -> Result<(), ResponseError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_open()?;
        self.headers.insert(name, value)?;
        Ok(())
    }

    /// Removes a header.
    pub fn remove_header<K>(&mut self, name: K) -> Result<Option<String>, ResponseError>
    where
        K: AsRef<str>,
    {
        self.ensure_open()?;
        Ok(self.headers.remove(name))
    }

    /// Cookies, in emission order.
    #[inline(always)]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Appends a cookie.
    pub fn add_cookie(&mut self, cookie: Cookie) -> Result<(), ResponseError> {
        self.ensure_open()?;
        self.cookies.push(cookie);
        Ok(())
    }

    /// Content type set on the response, if any.
    #[inline(always)]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Sets the content type.
    ///
    /// A `Content-Type` header added by the caller takes precedence.
    pub fn set_content_type<T>(&mut self, content_type: T) -> Result<(), ResponseError>
    where
        T: Into<String>,
    {
        self.ensure_open()?;
        self.content_type = Some(content_type.into());
        Ok(())
    }

    /// Character encoding, if any.
    #[inline(always)]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Sets the character encoding used by the default content type.
    pub fn set_encoding<E>(&mut self, encoding: E) -> Result<(), ResponseError>
    where
        E: Into<String>,
    {
        self.ensure_open()?;
        self.encoding = Some(encoding.into());
        Ok(())
    }

    /// Declared content length.
    ///
    /// This is advisory only: the emitted `Content-Length` is always computed
    /// from the actual payload.
    #[inline(always)]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Declares the content length.
    #[inline(always)]
    pub fn set_content_length(&mut self, content_length: u64) {
        self.content_length = Some(content_length);
    }

    /// Keep-alive duration in seconds.
    #[inline(always)]
    pub fn keep_alive(&self) -> u32 {
        self.keep_alive
    }

    /// Sets the keep-alive duration (seconds), clamped to [`MAX_KEEP_ALIVE`].
    ///
    /// `0` closes the connection after this response.
    #[inline(always)]
    pub fn set_keep_alive(&mut self, seconds: u32) {
        self.keep_alive = seconds.min(MAX_KEEP_ALIVE);
    }

    /// What the connection should do after this response.
    #[inline(always)]
    pub fn directive(&self) -> ConnectionDirective {
        self.directive
    }

    /// Sets what the connection should do after this response.
    ///
    /// `KeepAlive` can still be downgraded when the head is composed.
    #[inline(always)]
    pub fn set_directive(&mut self, directive: ConnectionDirective) {
        self.directive = directive;
    }

    /// Identifier of the originating request.
    #[inline(always)]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Arrival time of the originating request.
    #[inline(always)]
    pub fn arrived_at(&self) -> OffsetDateTime {
        self.arrived_at
    }

    /// Scheduling priority hint in `0..=2`.
    #[inline(always)]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Sets the priority hint. Values above `2` are normalized to `0`.
    #[inline(always)]
    pub fn set_priority(&mut self, priority: u8) {
        self.priority = if priority <= 2 { priority } else { 0 };
    }

    /// Whether the head has been composed.
    #[inline(always)]
    pub fn is_headers_sent(&self) -> bool {
        !matches!(self.head, HeadState::Open)
    }

    /// Whether transmission has ended (completed or aborted).
    #[inline(always)]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Whether transmission was abandoned because the connection refused a chunk.
    #[inline(always)]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Whether the head was handed to the connection and awaits [`Response::complete_head`].
    #[inline(always)]
    pub fn is_head_in_flight(&self) -> bool {
        matches!(self.head, HeadState::InFlight(_))
    }

    /// Number of payload bytes not yet handed to the connection.
    #[inline(always)]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Uses `len` bytes of `bytes` from `start` as payload.
    ///
    /// `len` set to [`None`] takes everything up to the end. The bytes are not
    /// copied. Any body written so far is discarded.
    pub fn set_raw<B>(
        &mut self,
        bytes: B,
        start: usize,
        len: Option<usize>,
    ) -> Result<(), ResponseError>
    where
        B: Into<Bytes>,
    {
        self.ensure_open()?;
        self.payload = Payload::Raw(RawWindow::new(bytes.into(), start, len));
        Ok(())
    }

    /// Appends bytes to the response body.
    pub fn write_body(&mut self, data: &[u8]) -> Result<(), ResponseError> {
        self.body_mut()?.extend_from_slice(data);
        Ok(())
    }

    /// Returns the growable body buffer, creating it if needed.
    pub fn body_mut(&mut self) -> Result<&mut BytesMut, ResponseError> {
        self.ensure_open()?;

        if let Payload::Empty = self.payload {
            self.payload = Payload::Body(BytesMut::new());
        }

        match &mut self.payload {
            Payload::Body(body) => Ok(body),
            _ => Err(ResponseError::RawPayloadActive),
        }
    }

    /// Freezes the head and hands the response to the connection.
    ///
    /// On [`SendOutcome::Started`], the connection is expected to call
    /// [`Response::step`] until it returns [`Step::Done`] or [`Step::Aborted`].
    pub fn send<C>(&mut self, ctx: &mut C) -> Result<SendOutcome, ResponseError>
    where
        C: ConnectionContext + ?Sized,
    {
        if self.sent || self.is_headers_sent() {
            return Err(ResponseError::AlreadySent);
        }

        if ctx.is_closing() {
            return Ok(SendOutcome::Skipped);
        }

        if ctx.max_requests() == 0 || self.keep_alive == 0 {
            self.directive = ConnectionDirective::Close;
            ctx.set_keep_alive_timeout(0);
        } else {
            ctx.set_keep_alive_timeout(u64::from(self.keep_alive) * 1000);
        }

        self.payload = match mem::take(&mut self.payload) {
            Payload::Raw(window) => match window.normalize() {
                Ok(window) if window.is_empty() => Payload::Empty,
                Ok(window) => Payload::Raw(window),
                Err(window) => {
                    self.payload = Payload::Raw(window);
                    return Ok(SendOutcome::Skipped);
                }
            },
            payload => payload,
        };

        let mut head = self.compose(&*ctx);

        if let Payload::Raw(window) = &self.payload {
            if head.len() + window.len() < COALESCE_THRESHOLD {
                head.extend_from_slice(window.as_slice());
                self.payload = Payload::Empty;
            }
        }

        if let Payload::Body(body) = &self.payload {
            if body.is_empty() {
                self.payload = Payload::Empty;
            }
        }

        self.head = HeadState::Pending(head);
        ctx.start_send_response(self.request_id);
        Ok(SendOutcome::Started)
    }

    /// Hands at most `budget` payload bytes (or the whole head) to the connection.
    ///
    /// Sources are drained in order: head, raw window, body buffer.
    pub fn step<C>(&mut self, ctx: &mut C, budget: usize) -> Step
    where
        C: ConnectionContext + ?Sized,
    {
        if self.sent {
            return self.ended();
        }

        match mem::replace(&mut self.head, HeadState::Released) {
            HeadState::Pending(head) => {
                if ctx.send_async_start(&head) {
                    self.head = HeadState::InFlight(head);
                    return Step::Continue;
                }

                head.release();
                return self.abort();
            }
            HeadState::InFlight(head) => {
                self.head = HeadState::InFlight(head);
                return Step::Continue;
            }
            HeadState::Open => {
                self.head = HeadState::Open;
                return Step::Aborted;
            }
            HeadState::Released => {}
        }

        if let Payload::Body(_) = self.payload {
            self.payload = mem::take(&mut self.payload).into_raw();
        }

        match &mut self.payload {
            Payload::Raw(window) if !window.is_empty() => {
                if budget == 0 {
                    return Step::Continue;
                }

                let chunk = window.take_front(budget);
                if window.is_empty() {
                    self.payload = Payload::Empty;
                }

                if ctx.send_async_start(&chunk) {
                    Step::Continue
                } else {
                    self.abort()
                }
            }
            _ => {
                self.payload = Payload::Empty;
                self.finish(ctx);
                Step::Done
            }
        }
    }

    /// Acknowledges the write of the head handed out by [`Response::step`].
    ///
    /// The head buffer goes back to its pool. If no payload remains the
    /// response is finished, otherwise the connection is asked to keep stepping.
    pub fn complete_head<C>(&mut self, ctx: &mut C) -> Step
    where
        C: ConnectionContext + ?Sized,
    {
        if let HeadState::InFlight(_) = self.head {
            self.release_head();
        }

        if self.sent {
            return self.ended();
        }

        if self.payload.is_empty() {
            self.payload = Payload::Empty;
            self.finish(ctx);
            Step::Done
        } else {
            ctx.continue_send_response();
            Step::Continue
        }
    }

    /// Releases the head buffer and drops the payload.
    ///
    /// For connections torn down mid-response. Calling it more than once is harmless.
    pub fn clear(&mut self) {
        self.release_head();
        self.payload = Payload::Empty;
    }

    fn ensure_open(&self) -> Result<(), ResponseError> {
        if self.is_headers_sent() {
            Err(ResponseError::HeadersSent)
        } else {
            Ok(())
        }
    }

    fn compose<C>(&mut self, ctx: &C) -> PooledBuffer
    where
        C: ConnectionContext + ?Sized,
    {
        self.head = HeadState::Released;

        let connection = ConnectionBlock::decide(self.status, self.directive, ctx);
        self.directive = connection.directive();

        let headers = mem::take(&mut self.headers);
        let mut buffer = self.pool.rent();

        HeadParts {
            version: &self.version,
            status: self.status,
            reason: self.reason.as_deref(),
            date: OffsetDateTime::now_utc(),
            content_length: self.payload.len(),
            content_type: self.content_type.as_deref(),
            encoding: self.encoding.as_deref(),
            connection,
            headers: &headers,
            cookies: &self.cookies,
        }
        .write(&mut buffer);

        buffer
    }

    fn release_head(&mut self) {
        match mem::replace(&mut self.head, HeadState::Released) {
            HeadState::Pending(head) | HeadState::InFlight(head) => head.release(),
            HeadState::Open => self.head = HeadState::Open,
            HeadState::Released => {}
        }
    }

    fn finish<C>(&mut self, ctx: &mut C)
    where
        C: ConnectionContext + ?Sized,
    {
        self.sent = true;
        ctx.end_send_response(self.request_id, self.directive);
    }

    fn abort(&mut self) -> Step {
        self.release_head();
        self.payload = Payload::Empty;
        self.sent = true;
        self.aborted = true;
        Step::Aborted
    }

    fn ended(&self) -> Step {
        if self.aborted {
            Step::Aborted
        } else {
            Step::Done
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("request_id", &self.request_id)
            .field("status", &self.status)
            .field("directive", &self.directive)
            .field("headers_sent", &self.is_headers_sent())
            .field("sent", &self.sent)
            .field("aborted", &self.aborted)
            .finish()
    }
}
