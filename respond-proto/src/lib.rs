#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod context;
pub mod cookie;
pub mod error;
pub mod head;
pub mod headers;
pub mod payload;
pub mod pool;
pub mod response;
pub mod status;

/// Protocol version used when the request does not carry one.
pub const HTTP_11: &str = "HTTP/1.1";
