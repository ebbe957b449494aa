use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Completes on its second poll, after waking itself once.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Gives every other runnable task a turn before resuming.
///
/// The calling task goes to the back of the run queue, behind all tasks
/// that were runnable at the time of the call.
///
/// # Examples
///
/// ```rust,ignore
/// courier::task::spawn(async { println!("second") });
/// courier::yield_now().await;
/// println!("third");
/// ```
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}
