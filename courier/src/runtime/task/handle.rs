use crate::runtime::task::Task;
use crate::runtime::task::state::COMPLETED;

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

/// An owned permission to await a spawned task's output.
///
/// Dropping a `JoinHandle` detaches the task: it keeps running, its
/// result is simply discarded.
pub struct JoinHandle<T> {
    pub(crate) task: Arc<Task<T>>,
}

impl<T> JoinHandle<T> {
    /// Returns `true` once the task has produced its output.
    pub fn is_finished(&self) -> bool {
        self.task.state.load(Ordering::Acquire) == COMPLETED
    }

    fn take_output(&self) -> Option<T> {
        if !self.is_finished() {
            return None;
        }

        // Safety: COMPLETED is stored after the result is written and
        // the worker never touches the slot again.
        unsafe { (*self.task.result.get()).take() }
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(value) = self.take_output() {
            return Poll::Ready(value);
        }

        // Register first, then re-check, so a completion racing with us
        // cannot be missed.
        self.task.waiters.lock().unwrap().push(cx.waker().clone());

        match self.take_output() {
            Some(value) => Poll::Ready(value),
            None if self.is_finished() => panic!("JoinHandle polled after completion"),
            None => Poll::Pending,
        }
    }
}
