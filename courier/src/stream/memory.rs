use super::Stream;
use crate::sync::Channel;

/// Error of a [`MemoryStream`] whose peer is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stream closed")]
pub struct StreamClosed;

/// One end of an in-process stream pair created by [`duplex`].
///
/// Each direction is a [`Channel`] of chunks; `capacity` chunks can be
/// in flight before `send` waits for the peer.
pub struct MemoryStream {
    incoming: Channel<Vec<u8>>,
    outgoing: Channel<Vec<u8>>,
    closed: bool,
}

/// Creates two connected streams.
///
/// # Examples
///
/// ```rust,ignore
/// let (mut a, mut b) = duplex(4);
/// a.send(b"hello").await?;
/// assert_eq!(b.receive().await?, b"hello");
/// ```
pub fn duplex(capacity: usize) -> (MemoryStream, MemoryStream) {
    let forward = Channel::with_capacity(capacity);
    let backward = Channel::with_capacity(capacity);

    (
        MemoryStream {
            incoming: backward.clone(),
            outgoing: forward.clone(),
            closed: false,
        },
        MemoryStream {
            incoming: forward,
            outgoing: backward,
            closed: false,
        },
    )
}

impl Stream for MemoryStream {
    type Error = StreamClosed;

    async fn receive(&mut self) -> Result<Vec<u8>, StreamClosed> {
        if self.closed {
            return Err(StreamClosed);
        }

        self.incoming.receive().await.ok_or(StreamClosed)
    }

    async fn send<'a>(&'a mut self, data: &'a [u8]) -> Result<(), StreamClosed> {
        if self.closed {
            return Err(StreamClosed);
        }

        if data.is_empty() {
            return Ok(());
        }

        self.outgoing
            .send(data.to_vec())
            .await
            .map_err(|_| StreamClosed)
    }

    /// Closes both directions; the peer drains what was already sent.
    fn close(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }

        let _ = self.outgoing.close();
        let _ = self.incoming.close();
    }

    fn pipe(&self) -> Result<Self, StreamClosed> {
        if self.closed {
            return Err(StreamClosed);
        }

        Ok(MemoryStream {
            incoming: self.incoming.clone(),
            outgoing: self.outgoing.clone(),
            closed: false,
        })
    }
}
