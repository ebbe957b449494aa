//! A typed, closable channel for passing values between tasks.
//!
//! A channel created with [`Channel::new`] is a rendezvous point: every
//! `send` waits for a matching `receive`. [`Channel::with_capacity`]
//! adds a buffer of `n` values that senders fill without waiting.
//!
//! Suspended senders and receivers are served first come, first
//! served. Closing wakes everyone: receivers drain what is buffered
//! and then see `None`, suspended senders fail with [`SendError`].

mod error;
mod future;
mod state;

pub use error::{CloseError, SendError, TryReceiveError, TrySendError};
pub use future::{ReceiveFuture, SendFuture};

use state::State;

use std::fmt;
use std::sync::{Arc, Mutex};

type Shared<T> = Arc<Mutex<State<T>>>;

/// A multi-producer, multi-consumer channel.
///
/// Cloning yields another handle to the same channel.
///
/// # Examples
///
/// ```rust,ignore
/// let channel = Channel::with_capacity(1);
///
/// let tx = channel.sender();
/// courier::task::spawn(async move {
///     tx.send("ping").await.unwrap();
///     tx.close().unwrap();
/// });
///
/// let mut messages = channel.iter();
/// while let Some(message) = messages.next().await {
///     println!("{message}");
/// }
/// ```
pub struct Channel<T> {
    shared: Shared<T>,
}

impl<T> Channel<T> {
    /// Creates an unbuffered channel.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a channel that buffers up to `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Mutex::new(State::new(capacity))),
        }
    }

    /// Sends `value`, waiting for buffer space or a receiver.
    ///
    /// Fails with the value if the channel is closed, including when
    /// it gets closed while this send is suspended.
    pub fn send(&self, value: T) -> SendFuture<T> {
        SendFuture::new(self.shared.clone(), value)
    }

    /// Receives the next value, waiting if there is none yet.
    ///
    /// Returns `None` once the channel is closed and every buffered
    /// value has been received, and on every call after that.
    pub fn receive(&self) -> ReceiveFuture<T> {
        ReceiveFuture::new(self.shared.clone())
    }

    /// Sends without waiting.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut wake = Vec::new();
        let result = self.shared.lock().unwrap().try_send(value, &mut wake);
        wake.into_iter().for_each(|w| w.wake());
        result
    }

    /// Receives without waiting.
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        let mut wake = Vec::new();
        let result = self.shared.lock().unwrap().try_receive(&mut wake);
        wake.into_iter().for_each(|w| w.wake());
        result
    }

    /// Closes the channel.
    ///
    /// Fails if the channel was already closed.
    pub fn close(&self) -> Result<(), CloseError> {
        let mut wake = Vec::new();
        let result = self.shared.lock().unwrap().close(&mut wake);
        wake.into_iter().for_each(|w| w.wake());
        result
    }

    /// Returns an async iterator over received values.
    ///
    /// It ends when the channel is closed and drained. Values it
    /// consumed are gone; a new `iter()` continues from the next one.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            channel: self.clone(),
        }
    }

    /// A send-only view of this channel.
    pub fn sender(&self) -> Sender<T> {
        Sender {
            channel: self.clone(),
        }
    }

    /// A receive-only view of this channel.
    pub fn receiver(&self) -> Receiver<T> {
        Receiver {
            channel: self.clone(),
        }
    }

    /// Number of buffered values.
    pub fn len(&self) -> usize {
        self.shared.lock().unwrap().buffered()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffer size; `0` for a rendezvous channel.
    pub fn capacity(&self) -> usize {
        self.shared.lock().unwrap().capacity
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().unwrap().closed
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock().unwrap();

        f.debug_struct("Channel")
            .field("len", &state.buffered())
            .field("capacity", &state.capacity)
            .field("closed", &state.closed)
            .finish()
    }
}

/// Async iterator returned by [`Channel::iter`] and [`Receiver::iter`].
pub struct Iter<T> {
    channel: Channel<T>,
}

impl<T> Iter<T> {
    /// Receives the next value, or `None` once the channel is closed
    /// and drained.
    pub async fn next(&mut self) -> Option<T> {
        self.channel.receive().await
    }
}

/// The sending side of a [`Channel`].
pub struct Sender<T> {
    channel: Channel<T>,
}

impl<T> Sender<T> {
    pub fn send(&self, value: T) -> SendFuture<T> {
        self.channel.send(value)
    }

    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.channel.try_send(value)
    }

    pub fn close(&self) -> Result<(), CloseError> {
        self.channel.close()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

/// The receiving side of a [`Channel`].
pub struct Receiver<T> {
    channel: Channel<T>,
}

impl<T> Receiver<T> {
    pub fn receive(&self) -> ReceiveFuture<T> {
        self.channel.receive()
    }

    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        self.channel.try_receive()
    }

    pub fn iter(&self) -> Iter<T> {
        self.channel.iter()
    }

    pub fn close(&self) -> Result<(), CloseError> {
        self.channel.close()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_share_the_channel() {
        let channel = Channel::with_capacity(2);
        let tx = channel.sender();
        let rx = channel.receiver();

        tx.try_send(1).unwrap();
        tx.try_send(2).unwrap();
        assert_eq!(channel.len(), 2);

        assert_eq!(rx.try_receive(), Ok(1));
        rx.close().unwrap();

        assert!(tx.is_closed());
        assert!(matches!(tx.try_send(3), Err(TrySendError::Closed(3))));
        assert_eq!(rx.try_receive(), Ok(2));
        assert_eq!(rx.try_receive(), Err(TryReceiveError::Closed));
    }

    #[test]
    fn rendezvous_try_send_needs_a_receiver() {
        let channel = Channel::new();

        assert_eq!(channel.capacity(), 0);
        assert!(matches!(channel.try_send(()), Err(TrySendError::Full(()))));
        assert_eq!(channel.try_receive(), Err(TryReceiveError::Empty));
    }
}
