use super::Role;

use std::error::Error;
use std::io;

/// Errors reported by [`TlsStream`](super::TlsStream).
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// The context does not match the requested role.
    #[error("a {found} context cannot drive a {expected} stream")]
    UnsupportedContext { expected: Role, found: Role },

    /// The TLS engine rejected the peer's records.
    #[error("TLS engine error: {0}")]
    Engine(#[from] rustls::Error),

    /// The underlying stream failed.
    #[error("transport failed: {0}")]
    Transport(#[source] Box<dyn Error + Send + Sync>),

    /// An earlier failure left the session unusable.
    #[error("TLS session failed earlier")]
    Failed,

    /// The session was closed, by the peer's `close_notify` or locally.
    #[error("TLS session closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TlsError {
    pub(crate) fn transport(err: impl Error + Send + Sync + 'static) -> Self {
        TlsError::Transport(Box::new(err))
    }
}
