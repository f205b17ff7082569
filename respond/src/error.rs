use respond_proto::error::ResponseError;

/// An enumeration representing the errors of a response transmission.
#[derive(thiserror::Error, Debug)]
pub enum SendError {
    /// The response was misused (e.g., sent twice).
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// The underlying writer failed.
    ///
    /// The connection is broken and no further response can be sent on it.
    #[error("connection lost: {0}")]
    Io(#[from] std::io::Error),

    /// The connection refused the response bytes.
    #[error("response aborted by the connection")]
    Aborted,
}
