use std::fmt;

/// Returned by `send` when the channel is closed.
///
/// Carries the value that could not be delivered.
#[derive(PartialEq, Eq, Clone, Copy, thiserror::Error)]
#[error("sending on a closed channel")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Returns the undelivered value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

/// Returned by `close` on a channel that is already closed.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
#[error("closing a closed channel")]
pub struct CloseError;

/// Returned by `try_send`.
#[derive(PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum TrySendError<T> {
    /// The buffer is full and no receiver is waiting.
    #[error("sending on a full channel")]
    Full(T),

    /// The channel is closed.
    #[error("sending on a closed channel")]
    Closed(T),
}

impl<T> TrySendError<T> {
    /// Returns the undelivered value.
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) | TrySendError::Closed(value) => value,
        }
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.write_str("Full(..)"),
            TrySendError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> From<SendError<T>> for TrySendError<T> {
    fn from(err: SendError<T>) -> Self {
        TrySendError::Closed(err.0)
    }
}

/// Returned by `try_receive`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
pub enum TryReceiveError {
    /// Nothing is buffered and no sender is waiting.
    #[error("receiving on an empty channel")]
    Empty,

    /// The channel is closed and drained.
    #[error("receiving on a closed channel")]
    Closed,
}
