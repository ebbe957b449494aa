use std::io;

/// Errors reported by [`TcpStream`](super::TcpStream) operations.
///
/// The variants that end a receive early carry the bytes that had
/// already been read. Those bytes are consumed: the caller owns them
/// and the stream stays usable for the next call, except after
/// `ConnectionReset`.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// The deadline expired before the operation completed.
    #[error("deadline expired with {} byte(s) received", .data.len())]
    Timeout { data: Vec<u8> },

    /// `max` bytes were buffered without finding the delimiter.
    #[error("no delimiter within {} byte(s)", .data.len())]
    NoBufferSpace { data: Vec<u8> },

    /// The peer closed or reset the connection.
    #[error("connection reset by peer with {} byte(s) received", .data.len())]
    ConnectionReset { data: Vec<u8> },

    /// The stream was closed locally.
    #[error("socket is closed")]
    Closed,

    #[error(transparent)]
    Io(io::Error),
}

impl SocketError {
    /// Bytes received before the operation failed.
    pub fn partial_data(&self) -> &[u8] {
        match self {
            SocketError::Timeout { data }
            | SocketError::NoBufferSpace { data }
            | SocketError::ConnectionReset { data } => data,
            SocketError::Closed | SocketError::Io(_) => &[],
        }
    }

    /// Takes the bytes received before the operation failed.
    pub fn into_partial_data(self) -> Vec<u8> {
        match self {
            SocketError::Timeout { data }
            | SocketError::NoBufferSpace { data }
            | SocketError::ConnectionReset { data } => data,
            SocketError::Closed | SocketError::Io(_) => Vec::new(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SocketError::Timeout { .. })
    }

    /// Attaches received bytes to the variants that carry them.
    pub(crate) fn with_data(self, data: Vec<u8>) -> Self {
        match self {
            SocketError::Timeout { .. } => SocketError::Timeout { data },
            SocketError::NoBufferSpace { .. } => SocketError::NoBufferSpace { data },
            SocketError::ConnectionReset { .. } => SocketError::ConnectionReset { data },
            other => other,
        }
    }
}

impl From<io::Error> for SocketError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => SocketError::ConnectionReset { data: Vec::new() },
            _ => SocketError::Io(err),
        }
    }
}
