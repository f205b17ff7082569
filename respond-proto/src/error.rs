use crate::headers::HeaderError;

/// Misuse of a [`Response`](crate::response::Response).
///
/// These are programming errors: they are reported synchronously and never retried.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum ResponseError {
    /// Head fields were modified after the head was composed.
    #[error("response headers already sent")]
    HeadersSent,

    /// `send` was called on a response already sent (or being sent).
    #[error("response already sent")]
    AlreadySent,

    /// The body buffer was written while a raw payload window is installed.
    #[error("a raw payload is already set on the response")]
    RawPayloadActive,

    /// A header could not be added.
    #[error(transparent)]
    Header(#[from] HeaderError),
}
