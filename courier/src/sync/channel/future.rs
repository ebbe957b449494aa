use super::Shared;
use super::error::{SendError, TryReceiveError, TrySendError};
use super::state::WaiterId;
use crate::runtime::context::current_queue;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`Channel::send`](super::Channel::send).
///
/// Dropping it while suspended withdraws the value from the channel.
pub struct SendFuture<T> {
    shared: Shared<T>,
    value: Option<T>,
    waiting: Option<WaiterId>,
}

impl<T> SendFuture<T> {
    pub(super) fn new(shared: Shared<T>, value: T) -> Self {
        Self {
            shared,
            value: Some(value),
            waiting: None,
        }
    }
}

impl<T> Unpin for SendFuture<T> {}

impl<T> Future for SendFuture<T> {
    type Output = Result<(), SendError<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut wake = Vec::new();
        let mut state = this.shared.lock().unwrap();

        if let Some(id) = this.waiting {
            if let Some(value) = state.rejected.remove(&id) {
                this.waiting = None;
                return Poll::Ready(Err(SendError(value)));
            }

            if let Some(waiter) = state.senders.iter_mut().find(|w| w.id == id) {
                waiter.waker.clone_from(cx.waker());
                return Poll::Pending;
            }

            // Neither waiting nor rejected: a receiver took the value.
            this.waiting = None;
            return Poll::Ready(Ok(()));
        }

        let Some(value) = this.value.take() else {
            panic!("SendFuture polled after completion");
        };

        let result = match state.try_send(value, &mut wake) {
            Ok(()) => Poll::Ready(Ok(())),
            Err(err) => match err {
                TrySendError::Closed(value) => Poll::Ready(Err(SendError(value))),
                TrySendError::Full(value) => {
                    let id = state.wait_send(value, cx.waker().clone(), current_queue());
                    this.waiting = Some(id);
                    Poll::Pending
                }
            },
        };

        drop(state);
        wake.into_iter().for_each(|w| w.wake());

        result
    }
}

impl<T> Drop for SendFuture<T> {
    fn drop(&mut self) {
        if let Some(id) = self.waiting.take() {
            if let Ok(mut state) = self.shared.lock() {
                let _ = state.cancel_send(id);
            }
        }
    }
}

/// Future returned by [`Channel::receive`](super::Channel::receive).
///
/// Resolves to `None` once the channel is closed and drained.
pub struct ReceiveFuture<T> {
    shared: Shared<T>,
    waiting: Option<WaiterId>,
    done: bool,
}

impl<T> ReceiveFuture<T> {
    pub(super) fn new(shared: Shared<T>) -> Self {
        Self {
            shared,
            waiting: None,
            done: false,
        }
    }
}

impl<T> Unpin for ReceiveFuture<T> {}

impl<T> Future for ReceiveFuture<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        assert!(!this.done, "ReceiveFuture polled after completion");

        let mut wake = Vec::new();
        let mut state = this.shared.lock().unwrap();

        if let Some(id) = this.waiting {
            if let Some(value) = state.delivered.remove(&id) {
                this.waiting = None;
                this.done = true;
                return Poll::Ready(Some(value));
            }

            if let Some(waiter) = state.receivers.iter_mut().find(|w| w.id == id) {
                waiter.waker.clone_from(cx.waker());
                return Poll::Pending;
            }

            // Released by `close`: fall through and drain.
            this.waiting = None;
        }

        let result = match state.try_receive(&mut wake) {
            Ok(value) => Poll::Ready(Some(value)),
            Err(TryReceiveError::Closed) => Poll::Ready(None),
            Err(TryReceiveError::Empty) => {
                let id = state.wait_receive(cx.waker().clone(), current_queue());
                this.waiting = Some(id);
                Poll::Pending
            }
        };

        drop(state);
        wake.into_iter().for_each(|w| w.wake());

        if result.is_ready() {
            this.done = true;
        }
        result
    }
}

impl<T> Drop for ReceiveFuture<T> {
    fn drop(&mut self) {
        let Some(id) = self.waiting.take() else {
            return;
        };

        let mut wake = Vec::new();
        if let Ok(mut state) = self.shared.lock() {
            state.cancel_receive(id, &mut wake);
        }
        wake.into_iter().for_each(|w| w.wake());
    }
}
