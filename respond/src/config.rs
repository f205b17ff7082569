//!
//! This module defines the configuration of a response [`Connection`](crate::Connection).
//!
//! ```
//! use respond::ConnectionConfig;
//! use std::time::Duration;
//!
//! let config = ConnectionConfig::builder()
//!     .keep_alive_timeout(Duration::from_secs(30))
//!     .unwrap()
//!     .max_requests(50)
//!     .write_budget(8 * 1024)
//!     .build();
//! ```

use respond_proto::pool::BufferPool;
use respond_proto::response::MAX_KEEP_ALIVE;
use std::time::Duration;

/// Default keep-alive timeout.
pub const DEFAULT_KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default maximum number of requests served on a connection.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default number of bytes handed to the writer per transmission step.
pub const DEFAULT_WRITE_BUDGET: usize = 16 * 1024;

/// Invalid keep-alive timeout.
#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
#[error("keep-alive timeout exceeds {} seconds", MAX_KEEP_ALIVE)]
pub struct InvalidKeepAliveTimeout;

/// Connection configuration.
///
/// You can create an instance of `ConnectionConfig` using its builder pattern by calling
/// the [`builder()`](Self::builder) method. [`Default`] gives the same values as
/// a builder with no option set.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    pub(crate) keep_alive_timeout: Duration,
    pub(crate) max_requests: u32,
    pub(crate) write_budget: usize,
    pub(crate) pool: BufferPool,
}

impl ConnectionConfig {
    /// Creates a builder to build up the connection configuration.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder(Self::default())
    }

    /// Keep-alive timeout advertised to clients.
    #[inline(always)]
    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_timeout
    }

    /// Maximum number of requests served on a connection.
    #[inline(always)]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Number of payload bytes handed to the writer per step.
    #[inline(always)]
    pub fn write_budget(&self) -> usize {
        self.write_budget
    }

    /// Pool the response heads are rented from.
    #[inline(always)]
    pub fn header_pool(&self) -> &BufferPool {
        &self.pool
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            keep_alive_timeout: DEFAULT_KEEP_ALIVE_TIMEOUT,
            max_requests: DEFAULT_MAX_REQUESTS,
            write_budget: DEFAULT_WRITE_BUDGET,
            pool: BufferPool::global().clone(),
        }
    }
}

/// Connection builder configuration.
pub struct ConnectionConfigBuilder(ConnectionConfig);

impl ConnectionConfigBuilder {
    /// Completes configuration process.
    #[must_use]
    pub fn build(self) -> ConnectionConfig {
        self.0
    }

    /// How long a client may keep the connection idle between requests.
    ///
    /// Sub-second precision is dropped. A zero duration disables keep-alive:
    /// every response closes the connection.
    pub fn keep_alive_timeout(
        mut self,
        timeout: Duration,
    ) -> Result<Self, InvalidKeepAliveTimeout> {
        if timeout.as_secs() > u64::from(MAX_KEEP_ALIVE) {
            return Err(InvalidKeepAliveTimeout);
        }

        self.0.keep_alive_timeout = Duration::from_secs(timeout.as_secs());
        Ok(self)
    }

    /// Maximum number of requests served on a connection.
    ///
    /// Once exhausted, the last response closes the connection.
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.0.max_requests = max_requests;
        self
    }

    /// Maximum number of payload bytes handed to the writer per step.
    ///
    /// Response heads are always written whole.
    pub fn write_budget(mut self, bytes: usize) -> Self {
        self.0.write_budget = bytes.max(1);
        self
    }

    /// Pool the response heads are rented from.
    ///
    /// By default, the [global pool](BufferPool::global).
    pub fn header_pool(mut self, pool: BufferPool) -> Self {
        self.0.pool = pool;
        self
    }
}
