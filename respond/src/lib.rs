//! Asynchronous HTTP/1.x response transmission.
//!
//! The entry point of this crate is [`Connection`], which writes
//! [`Response`]s to any [`AsyncWrite`](tokio::io::AsyncWrite) and negotiates
//! keep-alive with the client.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use respond::Connection;
//! use respond::ConnectionConfig;
//!
//! let config = ConnectionConfig::builder().max_requests(10).build();
//! let mut connection = Connection::new(Vec::new(), config);
//!
//! let request = connection.next_request();
//! let mut response = connection.response(&request);
//! response.add_header("Cache-Control", "no-cache")?;
//! response.set_raw(&b"Hello"[..], 0, None)?;
//!
//! connection.send_response(&mut response).await?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

/// Connection configuration.
pub mod config;

/// Response connection.
pub mod connection;

/// Errors definitions module.
pub mod error;

#[doc(inline)]
pub use config::ConnectionConfig;

#[doc(inline)]
pub use connection::Connection;

#[doc(inline)]
pub use error::SendError;

#[doc(inline)]
pub use respond_proto::response::Response;

#[doc(inline)]
pub use respond_proto::status::StatusCode;

/// Re-exports the sans-IO core.
pub use respond_proto as proto;
