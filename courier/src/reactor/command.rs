use super::poller::common::Interest;

use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::task::Waker;
use std::time::Instant;

/// Requests sent from tasks to the reactor thread.
pub(crate) enum Command {
    /// Wake `waker` once `fd` is ready in the given direction(s).
    ///
    /// Re-registering a direction replaces its previous waker.
    Register {
        fd: RawFd,
        interest: Interest,
        waker: Waker,
    },

    /// Drop interest in the given direction(s) of `fd`.
    Deregister { fd: RawFd, interest: Interest },

    /// Deregister `fd` entirely, wake anything still waiting on it and
    /// close it. Routing the close through the reactor guarantees the
    /// descriptor number is not reused while still registered.
    Close { fd: RawFd },

    /// Wake `waker` once the runtime clock reaches `deadline`.
    SetTimer {
        deadline: Instant,
        waker: Waker,
        cancelled: Arc<AtomicBool>,
    },

    Shutdown,
}
