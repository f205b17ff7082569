use crate::config::ConnectionConfig;
use crate::error::SendError;
use bytes::BytesMut;
use respond_proto::context::ConnectionContext;
use respond_proto::context::ConnectionDirective;
use respond_proto::context::RequestId;
use respond_proto::context::RequestMeta;
use respond_proto::response::Response;
use respond_proto::response::SendOutcome;
use respond_proto::response::Step;
use respond_proto::response::MAX_KEEP_ALIVE;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use tracing::trace;
use tracing::warn;

/// An HTTP/1.x connection writing responses to `W`.
///
/// Responses are transmitted one at a time, in the order they are passed to
/// [`Connection::send_response`].
pub struct Connection<W> {
    writer: W,
    config: ConnectionConfig,
    outbound: BytesMut,
    keep_alive_timeout: u64,
    requests_remaining: u32,
    next_request: RequestId,
    current: Option<RequestId>,
    closing: bool,
    broken: bool,
}

impl<W> Connection<W>
where
    W: AsyncWrite + Unpin,
{
    /// Creates a connection on top of `writer`.
    pub fn new(writer: W, config: ConnectionConfig) -> Self {
        let keep_alive_timeout =
            u64::try_from(config.keep_alive_timeout.as_millis()).unwrap_or(u64::MAX);

        Self {
            writer,
            outbound: BytesMut::with_capacity(config.write_budget),
            keep_alive_timeout,
            requests_remaining: config.max_requests,
            next_request: RequestId::new(0),
            current: None,
            closing: config.max_requests == 0,
            broken: false,
            config,
        }
    }

    /// Allocates the metadata of a request arrived now.
    pub fn next_request(&mut self) -> RequestMeta {
        let id = self.next_request;
        self.next_request = id.next();
        RequestMeta::new(id)
    }

    /// Creates a response to `request` configured for this connection.
    pub fn response(&self, request: &RequestMeta) -> Response {
        let keep_alive =
            u32::try_from(self.config.keep_alive_timeout.as_secs()).unwrap_or(MAX_KEEP_ALIVE);

        let mut response = Response::with_pool(request, self.config.pool.clone());
        response.set_keep_alive(keep_alive);
        response
    }

    /// Transmits `response` entirely.
    ///
    /// Returns the negotiated directive, or [`None`] if nothing was sent
    /// (closing connection, or raw payload window out of range).
    ///
    /// On writer failure the connection is marked as broken, the resources
    /// held by `response` are released, and the I/O error is returned.
    pub async fn send_response(
        &mut self,
        response: &mut Response,
    ) -> Result<Option<ConnectionDirective>, SendError> {
        let request_id = response.request_id();

        if let SendOutcome::Skipped = response.send(self)? {
            debug!(%request_id, closing = self.closing, "Response skipped");
            return Ok(None);
        }

        let budget = self.config.write_budget;

        loop {
            match response.step(self, budget) {
                Step::Continue => {
                    if let Err(error) = self.flush().await {
                        warn!(%request_id, "Response write failed: {error}");
                        self.broken = true;
                        self.closing = true;
                        response.clear();
                        return Err(SendError::Io(error));
                    }

                    if response.is_head_in_flight() {
                        if let Step::Done = response.complete_head(self) {
                            break;
                        }
                    }
                }
                Step::Done => break,
                Step::Aborted => {
                    warn!(%request_id, "Response aborted");
                    return Err(SendError::Aborted);
                }
            }
        }

        Ok(Some(response.directive()))
    }

    /// Flushes pending bytes and shuts the writer down.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.closing = true;
        self.flush().await?;
        self.writer.shutdown().await
    }

    /// Whether a write failed on this connection.
    #[inline(always)]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Request whose response is being transmitted, if any.
    #[inline(always)]
    pub fn current_request(&self) -> Option<RequestId> {
        self.current
    }

    /// Returns a reference to the underlying writer.
    #[inline(always)]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consumes the connection, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        if self.outbound.is_empty() {
            return Ok(());
        }

        trace!(len = self.outbound.len(), "Flushing");

        let result = self.writer.write_all(&self.outbound).await;
        self.outbound.clear();
        result?;

        self.writer.flush().await
    }
}

impl<W> ConnectionContext for Connection<W> {
    fn is_closing(&self) -> bool {
        self.closing || self.broken
    }

    fn keep_alive_timeout(&self) -> u64 {
        self.keep_alive_timeout
    }

    fn set_keep_alive_timeout(&mut self, millis: u64) {
        self.keep_alive_timeout = millis;
    }

    fn max_requests(&self) -> u32 {
        // The response being composed uses one of the remaining requests.
        self.requests_remaining.saturating_sub(1)
    }

    fn start_send_response(&mut self, request_id: RequestId) {
        debug!(%request_id, "Response started");
        self.current = Some(request_id);
    }

    fn send_async_start(&mut self, chunk: &[u8]) -> bool {
        if self.broken || self.closing {
            return false;
        }

        self.outbound.extend_from_slice(chunk);
        true
    }

    fn continue_send_response(&mut self) {
        trace!(request_id = ?self.current, "Head written");
    }

    fn end_send_response(&mut self, request_id: RequestId, directive: ConnectionDirective) {
        self.requests_remaining = self.requests_remaining.saturating_sub(1);
        self.current = None;

        if directive == ConnectionDirective::Close || self.requests_remaining == 0 {
            self.closing = true;
        }

        debug!(
            %request_id,
            ?directive,
            remaining = self.requests_remaining,
            "Response completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use respond_proto::pool::BufferPool;
    use respond_proto::status::StatusCode;
    use std::io;
    use std::pin::Pin;
    use std::task::Context;
    use std::task::Poll;
    use std::time::Duration;
    use time::OffsetDateTime;

    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn config(pool: &BufferPool) -> ConnectionConfig {
        ConnectionConfig::builder().header_pool(pool.clone()).build()
    }

    fn output<W: AsRef<[u8]>>(connection: &Connection<W>) -> String
    where
        W: AsyncWrite + Unpin,
    {
        String::from_utf8_lossy(connection.get_ref().as_ref()).into_owned()
    }

    #[tokio::test]
    async fn keep_alive_sequence() -> anyhow::Result<()> {
        init_tracing();
        let pool = BufferPool::new(512, 4);
        let mut connection = Connection::new(Vec::new(), config(&pool));

        for body in ["first", "second"] {
            let request = connection.next_request();
            let mut response = connection.response(&request);
            response.set_raw(body.as_bytes().to_vec(), 0, None)?;

            let directive = connection.send_response(&mut response).await?;
            assert_eq!(directive, Some(ConnectionDirective::KeepAlive));
            assert!(response.is_sent());
        }

        let written = output(&connection);
        assert_eq!(written.matches("HTTP/1.1 200 OK\r\n").count(), 2);
        assert!(written.contains("Keep-Alive: timeout=5, max=99\r\n"));
        assert!(written.contains("Keep-Alive: timeout=5, max=98\r\n"));
        assert!(written.ends_with("\r\n\r\nsecond"));
        assert!(!connection.is_closing());
        assert_eq!(connection.current_request(), None);
        assert_eq!(pool.outstanding(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn large_body_chunked() -> anyhow::Result<()> {
        init_tracing();
        let pool = BufferPool::new(512, 4);
        let config = ConnectionConfig::builder()
            .header_pool(pool.clone())
            .write_budget(1000)
            .build();
        let mut connection = Connection::new(Vec::new(), config);

        let request = connection.next_request();
        let mut response = connection.response(&request);
        response.write_body(&[b'z'; 12_345])?;

        connection.send_response(&mut response).await?;

        let written = connection.get_ref();
        let head_len = written
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map(|position| position + 4)
            .unwrap_or_default();
        assert!(output(&connection).contains("Content-Length: 12345\r\n"));
        assert_eq!(written.len() - head_len, 12_345);
        assert!(written[head_len..].iter().all(|byte| *byte == b'z'));
        assert_eq!(pool.outstanding(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn close_then_skip() -> anyhow::Result<()> {
        init_tracing();
        let mut connection = Connection::new(Vec::new(), ConnectionConfig::default());

        let request = connection.next_request();
        let mut response = Response::error_page(&request, StatusCode::BAD_REQUEST);
        let directive = connection.send_response(&mut response).await?;

        assert_eq!(directive, Some(ConnectionDirective::Close));
        assert!(connection.is_closing());
        assert!(output(&connection).contains("Connection: close\r\n"));

        let len = connection.get_ref().len();
        let request = connection.next_request();
        let mut response = connection.response(&request);
        assert_eq!(connection.send_response(&mut response).await?, None);
        assert!(!response.is_headers_sent());
        assert_eq!(connection.get_ref().len(), len);

        Ok(())
    }

    #[tokio::test]
    async fn max_requests_exhausted() -> anyhow::Result<()> {
        init_tracing();
        let config = ConnectionConfig::builder().max_requests(2).build();
        let mut connection = Connection::new(Vec::new(), config);

        let request = connection.next_request();
        let mut response = connection.response(&request);
        let directive = connection.send_response(&mut response).await?;

        assert_eq!(directive, Some(ConnectionDirective::KeepAlive));
        assert!(output(&connection).contains("Keep-Alive: timeout=5, max=1\r\n"));
        assert!(!connection.is_closing());

        let len = connection.get_ref().len();
        let request = connection.next_request();
        let mut response = connection.response(&request);
        let directive = connection.send_response(&mut response).await?;

        let last = String::from_utf8_lossy(&connection.get_ref()[len..]).into_owned();
        assert_eq!(directive, Some(ConnectionDirective::Close));
        assert!(last.contains("Connection: close\r\n"));
        assert!(!last.contains("Keep-Alive"));
        assert!(connection.is_closing());

        Ok(())
    }

    #[tokio::test]
    async fn keep_alive_disabled() -> anyhow::Result<()> {
        init_tracing();
        let config = ConnectionConfig::builder()
            .keep_alive_timeout(Duration::ZERO)?
            .build();
        let mut connection = Connection::new(Vec::new(), config);

        let request = connection.next_request();
        let mut response = connection.response(&request);
        let directive = connection.send_response(&mut response).await?;

        assert_eq!(directive, Some(ConnectionDirective::Close));
        assert_eq!(connection.keep_alive_timeout(), 0);
        assert!(output(&connection).contains("Connection: close\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn request_version_echoed() -> anyhow::Result<()> {
        let mut connection = Connection::new(Vec::new(), ConnectionConfig::default());
        let request = RequestMeta {
            id: RequestId::new(42),
            arrived_at: OffsetDateTime::UNIX_EPOCH,
            version: "HTTP/1.0".to_string(),
        };

        let mut response = connection.response(&request);
        assert_eq!(response.arrived_at(), OffsetDateTime::UNIX_EPOCH);
        connection.send_response(&mut response).await?;

        assert!(output(&connection).starts_with("HTTP/1.0 200 OK\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn write_failure() {
        init_tracing();
        let pool = BufferPool::new(512, 4);
        let mut connection = Connection::new(FailingWriter, config(&pool));

        let request = connection.next_request();
        let mut response = connection.response(&request);
        response.write_body(&[0; 64 * 1024]).unwrap();

        let result = connection.send_response(&mut response).await;
        assert!(matches!(result, Err(SendError::Io(_))));
        assert!(connection.is_broken());
        assert!(connection.is_closing());
        assert_eq!(response.payload_len(), 0);
        assert_eq!(pool.outstanding(), 0);

        let request = connection.next_request();
        let mut response = connection.response(&request);
        assert!(matches!(connection.send_response(&mut response).await, Ok(None)));
    }

    #[tokio::test]
    async fn send_twice() {
        let mut connection = Connection::new(Vec::new(), ConnectionConfig::default());

        let request = connection.next_request();
        let mut response = connection.response(&request);
        connection.send_response(&mut response).await.unwrap();

        assert!(matches!(
            connection.send_response(&mut response).await,
            Err(SendError::Response(_))
        ));
    }

    #[tokio::test]
    async fn shutdown() -> anyhow::Result<()> {
        let mut connection = Connection::new(Vec::new(), ConnectionConfig::default());
        connection.shutdown().await?;

        assert!(connection.is_closing());
        assert!(connection.into_inner().is_empty());

        Ok(())
    }
}
