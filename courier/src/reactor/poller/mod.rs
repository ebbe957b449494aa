//! OS readiness backend for the reactor.
//!
//! Linux only: `epoll` for readiness, an `eventfd` to interrupt a
//! blocked wait, and thin socket syscall wrappers used by `net`.

pub(crate) mod common;

pub(crate) use common::Waker;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
