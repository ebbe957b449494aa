use super::error::{CloseError, TryReceiveError, TrySendError};
use crate::runtime::queue::QueueHandle;

use std::collections::{HashMap, VecDeque};
use std::task::Waker;

/// Identifies a suspended send or receive.
pub(super) type WaiterId = u64;

/// A suspended sender and the value it is trying to deliver.
pub(super) struct SendWaiter<T> {
    pub(super) id: WaiterId,
    pub(super) value: T,
    pub(super) waker: Waker,
    pub(super) census: Option<QueueHandle>,
}

/// A suspended receiver.
pub(super) struct ReceiveWaiter {
    pub(super) id: WaiterId,
    pub(super) waker: Waker,
    pub(super) census: Option<QueueHandle>,
}

/// Everything behind a channel's lock.
///
/// Invariants:
/// - `receivers` is only non-empty while `queue` is empty and no
///   sender is waiting,
/// - `queue` never holds more than `capacity` values,
/// - `senders` is only non-empty while `queue` is full,
/// - once `closed` is set, both wait sets stay empty.
///
/// Operations never call a waker; they push the wakers to call into
/// `wake` so the caller can run them after releasing the lock.
pub(super) struct State<T> {
    pub(super) queue: VecDeque<T>,
    pub(super) capacity: usize,
    pub(super) closed: bool,

    pub(super) senders: VecDeque<SendWaiter<T>>,
    pub(super) receivers: VecDeque<ReceiveWaiter>,

    /// Values taken back from receivers that gave up after delivery.
    /// They are older than anything in `queue` and are received first.
    pub(super) returned: VecDeque<T>,

    /// Values handed straight to a suspended receiver, not yet collected.
    pub(super) delivered: HashMap<WaiterId, T>,

    /// Values of senders that were suspended when the channel closed.
    pub(super) rejected: HashMap<WaiterId, T>,

    next_id: WaiterId,
}

impl<T> State<T> {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            closed: false,
            senders: VecDeque::new(),
            receivers: VecDeque::new(),
            returned: VecDeque::new(),
            delivered: HashMap::new(),
            rejected: HashMap::new(),
            next_id: 0,
        }
    }

    /// Values a receive can take without waiting on a sender.
    pub(super) fn buffered(&self) -> usize {
        self.returned.len() + self.queue.len()
    }

    pub(super) fn next_id(&mut self) -> WaiterId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Delivers `value` to the oldest suspended receiver, or buffers it.
    pub(super) fn try_send(&mut self, value: T, wake: &mut Vec<Waker>) -> Result<(), TrySendError<T>> {
        if self.closed {
            return Err(TrySendError::Closed(value));
        }

        if let Some(receiver) = self.receivers.pop_front() {
            leave_wait_set(&receiver.census);
            self.delivered.insert(receiver.id, value);
            wake.push(receiver.waker);
            return Ok(());
        }

        if self.queue.len() < self.capacity {
            self.queue.push_back(value);
            return Ok(());
        }

        Err(TrySendError::Full(value))
    }

    /// Takes the oldest value, from the buffer first, then from the
    /// oldest suspended sender.
    pub(super) fn try_receive(&mut self, wake: &mut Vec<Waker>) -> Result<T, TryReceiveError> {
        if let Some(value) = self.returned.pop_front() {
            return Ok(value);
        }

        if let Some(value) = self.queue.pop_front() {
            // A slot just opened up: the oldest blocked sender fills it.
            if self.queue.len() < self.capacity {
                if let Some(sender) = self.senders.pop_front() {
                    leave_wait_set(&sender.census);
                    self.queue.push_back(sender.value);
                    wake.push(sender.waker);
                }
            }
            return Ok(value);
        }

        if let Some(sender) = self.senders.pop_front() {
            leave_wait_set(&sender.census);
            wake.push(sender.waker);
            return Ok(sender.value);
        }

        if self.closed {
            Err(TryReceiveError::Closed)
        } else {
            Err(TryReceiveError::Empty)
        }
    }

    /// Closes the channel, releasing every suspended sender and receiver.
    pub(super) fn close(&mut self, wake: &mut Vec<Waker>) -> Result<(), CloseError> {
        if self.closed {
            return Err(CloseError);
        }
        self.closed = true;

        for receiver in self.receivers.drain(..) {
            leave_wait_set(&receiver.census);
            wake.push(receiver.waker);
        }

        for sender in self.senders.drain(..) {
            leave_wait_set(&sender.census);
            self.rejected.insert(sender.id, sender.value);
            wake.push(sender.waker);
        }

        Ok(())
    }

    /// Suspends a receiver at the back of the wait set.
    pub(super) fn wait_receive(&mut self, waker: Waker, census: Option<QueueHandle>) -> WaiterId {
        let id = self.next_id();
        enter_wait_set(&census);
        self.receivers.push_back(ReceiveWaiter { id, waker, census });
        id
    }

    /// Suspends a sender at the back of the wait set.
    pub(super) fn wait_send(&mut self, value: T, waker: Waker, census: Option<QueueHandle>) -> WaiterId {
        let id = self.next_id();
        enter_wait_set(&census);
        self.senders.push_back(SendWaiter {
            id,
            value,
            waker,
            census,
        });
        id
    }

    /// Forgets a suspended receiver that gave up.
    ///
    /// A value that was already handed to it goes to the next receiver
    /// in line, or is kept aside for the next receive.
    pub(super) fn cancel_receive(&mut self, id: WaiterId, wake: &mut Vec<Waker>) {
        if let Some(value) = self.delivered.remove(&id) {
            if let Some(next) = self.receivers.pop_front() {
                leave_wait_set(&next.census);
                self.delivered.insert(next.id, value);
                wake.push(next.waker);
            } else {
                self.returned.push_back(value);
            }
            return;
        }

        if let Some(pos) = self.receivers.iter().position(|w| w.id == id) {
            if let Some(waiter) = self.receivers.remove(pos) {
                leave_wait_set(&waiter.census);
            }
        }
    }

    /// Forgets a suspended sender that gave up, dropping its value.
    pub(super) fn cancel_send(&mut self, id: WaiterId) -> Option<T> {
        if let Some(value) = self.rejected.remove(&id) {
            return Some(value);
        }

        let pos = self.senders.iter().position(|w| w.id == id)?;
        let waiter = self.senders.remove(pos)?;
        leave_wait_set(&waiter.census);

        Some(waiter.value)
    }
}

fn enter_wait_set(census: &Option<QueueHandle>) {
    if let Some(queue) = census {
        queue.census().channel_waiters += 1;
    }
}

fn leave_wait_set(census: &Option<QueueHandle>) {
    if let Some(queue) = census {
        queue.census().channel_waiters -= 1;
    }
}
