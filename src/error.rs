//! Unified error type.

/// The error type returned by bulwark's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP responses
/// written through a [`ResponseWriter`](crate::ResponseWriter), not as
/// `Error`s. This type surfaces infrastructure failures: binding a port,
/// reading a request, or writing to a client that is no longer there.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    #[error("http: {0}")]
    Http(#[from] hyper::Error),

    /// The client side of the response went away.
    #[error("response closed")]
    Closed,

    /// The handler panicked after committing the response head.
    #[error("response aborted mid-body")]
    Aborted,

    /// The handler panicked before committing a response head.
    #[error("handler exited without a response")]
    Abandoned,
}
