use super::Deadline;
use crate::reactor::command::Command;
use crate::runtime::context::{current_queue, current_reactor};
use crate::runtime::queue::QueueHandle;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

/// Waits until `duration` has elapsed on the runtime clock.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::new(Deadline::after(duration))
}

/// Waits until the runtime clock reaches `deadline`.
///
/// A deadline in the past completes on the first poll without
/// suspending. [`Deadline::Never`] never completes.
pub fn sleep_until(deadline: impl Into<Deadline>) -> Sleep {
    Sleep::new(deadline.into())
}

/// Future returned by [`sleep`] and [`sleep_until`].
///
/// The timer is handed to the reactor on first poll and counted as an
/// outstanding wake source until the sleep completes or is dropped.
/// Dropping an unfinished `Sleep` cancels its timer.
pub struct Sleep {
    deadline: Deadline,

    /// Present once the timer has been handed to the reactor.
    timer: Option<ArmedTimer>,
}

struct ArmedTimer {
    cancelled: Arc<AtomicBool>,
    census: Option<QueueHandle>,
}

impl Sleep {
    pub(crate) fn new(deadline: Deadline) -> Self {
        Self {
            deadline,
            timer: None,
        }
    }

    /// The deadline this sleep completes at.
    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancelled.store(true, Ordering::Release);

            if let Some(queue) = timer.census {
                queue.census().timers -= 1;
            }
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let Some(at) = this.deadline.instant() else {
            return Poll::Pending;
        };

        let reactor = current_reactor().expect("Sleep polled outside of runtime");

        if this.deadline.has_passed(reactor.clock().now()) {
            this.disarm();
            return Poll::Ready(());
        }

        if this.timer.is_none() {
            let cancelled = Arc::new(AtomicBool::new(false));

            let census = current_queue();
            if let Some(queue) = &census {
                queue.census().timers += 1;
            }

            this.timer = Some(ArmedTimer {
                cancelled: cancelled.clone(),
                census,
            });

            let _ = reactor.send(Command::SetTimer {
                deadline: at,
                waker: cx.waker().clone(),
                cancelled,
            });
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.disarm();
    }
}

