use super::Deadline;
use super::sleep::{Sleep, sleep_until};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Error returned by [`timeout`] and [`timeout_at`] when the deadline
/// is reached first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline has elapsed")]
pub struct Elapsed;

/// Bounds `future` by `duration`, measured on the runtime clock.
///
/// # Examples
///
/// ```rust,ignore
/// match timeout(Duration::from_millis(50), listener.accept()).await {
///     Ok(accepted) => handle(accepted?),
///     Err(Elapsed) => println!("nobody came"),
/// }
/// ```
pub fn timeout<F>(duration: Duration, future: F) -> Timeout<F>
where
    F: Future,
{
    timeout_at(Deadline::after(duration), future)
}

/// Bounds `future` by an absolute deadline.
///
/// The inner future is polled first, so a future that is ready at the
/// deadline still wins. Dropping the returned future drops the inner
/// one, which releases whatever it was waiting on.
pub fn timeout_at<F>(deadline: impl Into<Deadline>, future: F) -> Timeout<F>
where
    F: Future,
{
    Timeout {
        future,
        sleep: sleep_until(deadline),
    }
}

/// Future returned by [`timeout`] and [`timeout_at`].
pub struct Timeout<F> {
    future: F,
    sleep: Sleep,
}

impl<F> Future for Timeout<F>
where
    F: Future,
{
    type Output = Result<F::Output, Elapsed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Safety: `future` is never moved out of a pinned `Timeout`.
        let this = unsafe { self.get_unchecked_mut() };

        let future = unsafe { Pin::new_unchecked(&mut this.future) };
        if let Poll::Ready(val) = future.poll(cx) {
            return Poll::Ready(Ok(val));
        }

        if let Poll::Ready(()) = Pin::new(&mut this.sleep).poll(cx) {
            return Poll::Ready(Err(Elapsed));
        }

        Poll::Pending
    }
}
