use crate::reactor::ReactorHandle;
use crate::runtime::queue::QueueHandle;

use std::cell::RefCell;

thread_local! {
    /// Reactor of the runtime the current thread works for.
    ///
    /// Timers, sockets and deadlines reach the reactor (and its clock)
    /// through this slot instead of taking a handle argument.
    static CURRENT_REACTOR: RefCell<Option<ReactorHandle>> = const { RefCell::new(None) };

    /// Run queue of the runtime the current thread works for.
    ///
    /// Used by `spawn` and by channel operations to reach the census.
    static CURRENT_QUEUE: RefCell<Option<QueueHandle>> = const { RefCell::new(None) };
}

/// Returns the reactor of the current runtime, if any.
pub(crate) fn current_reactor() -> Option<ReactorHandle> {
    CURRENT_REACTOR.with(|r| r.borrow().clone())
}

/// Returns the run queue of the current runtime, if any.
pub(crate) fn current_queue() -> Option<QueueHandle> {
    CURRENT_QUEUE.with(|q| q.borrow().clone())
}

/// Runs `f` with `reactor` and `queue` installed as the current runtime.
///
/// The previous context is restored afterwards, so nested runtimes on
/// the same thread see their own handles.
pub(crate) fn enter_context<R>(
    reactor: ReactorHandle,
    queue: QueueHandle,
    f: impl FnOnce() -> R,
) -> R {
    let prev_reactor = CURRENT_REACTOR.with(|r| r.replace(Some(reactor)));
    let prev_queue = CURRENT_QUEUE.with(|q| q.replace(Some(queue)));

    let out = f();

    CURRENT_QUEUE.with(|q| q.replace(prev_queue));
    CURRENT_REACTOR.with(|r| r.replace(prev_reactor));

    out
}
