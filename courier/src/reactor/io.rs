use crate::reactor::poller::common::Interest;

use std::task::Waker;

/// Wakers parked on one file descriptor.
///
/// Each direction holds at most one waker: a stream is driven by at
/// most one reader and one writer at a time. Wakers are one-shot; the
/// reactor takes them when the matching readiness is reported and the
/// owning future re-registers if it still has to wait.
#[derive(Default)]
pub(crate) struct IoEntry {
    /// Task waiting for the descriptor to become readable.
    pub(crate) reader: Option<Waker>,

    /// Task waiting for the descriptor to become writable.
    pub(crate) writer: Option<Waker>,
}

impl IoEntry {
    /// Returns the readiness directions someone is waiting on.
    pub(crate) fn interest(&self) -> Interest {
        Interest {
            read: self.reader.is_some(),
            write: self.writer.is_some(),
        }
    }

    /// Stores `waker` for every direction in `interest`.
    pub(crate) fn set(&mut self, interest: Interest, waker: Waker) {
        if interest.read && interest.write {
            self.reader = Some(waker.clone());
            self.writer = Some(waker);
        } else if interest.read {
            self.reader = Some(waker);
        } else if interest.write {
            self.writer = Some(waker);
        }
    }

    /// Forgets the wakers of every direction in `interest`.
    pub(crate) fn clear(&mut self, interest: Interest) {
        if interest.read {
            self.reader = None;
        }
        if interest.write {
            self.writer = None;
        }
    }

    /// Wakes all tasks associated with this entry.
    pub(crate) fn wake_all(self) {
        if let Some(waker) = self.reader {
            waker.wake();
        }
        if let Some(waker) = self.writer {
            waker.wake();
        }
    }
}
