//! Readiness polling on top of Linux `epoll`.
//!
//! Registrations are level-triggered and keyed by a token chosen by the
//! reactor (the descriptor itself). The reactor only keeps a descriptor
//! registered while a task waits on it, so a permanently readable socket
//! does not spin the reactor.

use super::common::{Interest, Waker};
use crate::reactor::event::Event;

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLOUT, EPOLLRDHUP, epoll_event,
};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Token of the wake-up eventfd. Descriptors are never negative.
const WAKE_TOKEN: u64 = u64::MAX;

/// Events collected per `epoll_wait`.
const BATCH: usize = 64;

pub(crate) struct EpollPoller {
    epoll: RawFd,
    ready: Vec<epoll_event>,
    waker: Arc<Waker>,
}

// The raw event buffer is only touched by the reactor thread.
unsafe impl Send for EpollPoller {}

impl EpollPoller {
    /// Creates the epoll instance with its wake-up eventfd already armed.
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = check(unsafe { libc::epoll_create1(EPOLL_CLOEXEC) })?;

        let waker = match Waker::new() {
            Ok(waker) => Arc::new(waker),
            Err(err) => {
                unsafe { libc::close(epoll) };
                return Err(err);
            }
        };

        // From here on `Drop` closes the epoll descriptor.
        let poller = Self {
            epoll,
            ready: Vec::with_capacity(BATCH),
            waker,
        };

        poller.ctl(EPOLL_CTL_ADD, poller.waker.fd(), WAKE_TOKEN, EPOLLIN as u32)?;
        Ok(poller)
    }

    pub(crate) fn waker(&self) -> Arc<Waker> {
        Arc::clone(&self.waker)
    }

    pub(crate) fn register(&self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, token as u64, flags_for(interest))
    }

    pub(crate) fn reregister(&self, fd: RawFd, token: usize, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, token as u64, flags_for(interest))
    }

    /// Removes `fd`. A descriptor that is already gone is not an error.
    pub(crate) fn deregister(&self, fd: RawFd) {
        let _ = check(unsafe { libc::epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) });
    }

    fn ctl(&self, op: i32, fd: RawFd, token: u64, flags: u32) -> io::Result<()> {
        let mut event = epoll_event {
            events: flags,
            u64: token,
        };

        check(unsafe { libc::epoll_ctl(self.epoll, op, fd, &mut event) }).map(drop)
    }

    /// Waits for readiness, a wake-up, or `timeout`, and fills `events`
    /// with one merged entry per token.
    pub(crate) fn poll(&mut self, events: &mut Vec<Event>, timeout: Option<Duration>) -> io::Result<()> {
        events.clear();

        let n = unsafe {
            libc::epoll_wait(
                self.epoll,
                self.ready.as_mut_ptr(),
                BATCH as i32,
                timeout_millis(timeout),
            )
        };

        let n = match check(n) {
            Ok(n) => n as usize,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(err) => return Err(err),
        };

        // Safety: epoll_wait initialized the first `n` entries.
        unsafe { self.ready.set_len(n) };

        for raw in self.ready.drain(..) {
            let (token, bits) = (raw.u64, raw.events);

            if token == WAKE_TOKEN {
                self.waker.reset();
                continue;
            }

            let event = readiness(token as usize, bits);

            match events.iter_mut().find(|e| e.token == event.token) {
                Some(seen) => {
                    seen.readable |= event.readable;
                    seen.writable |= event.writable;
                }
                None => events.push(event),
            }
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe { libc::close(self.epoll) };
    }
}

fn check(rc: i32) -> io::Result<i32> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

fn flags_for(interest: Interest) -> u32 {
    let mut flags = EPOLLRDHUP;
    if interest.read {
        flags |= EPOLLIN;
    }
    if interest.write {
        flags |= EPOLLOUT;
    }
    flags as u32
}

/// Errors and hang-ups wake both directions so each waiter retries its
/// syscall and sees the failure itself.
fn readiness(token: usize, bits: u32) -> Event {
    let failed = bits & (EPOLLERR | EPOLLHUP) as u32 != 0;

    Event {
        token,
        readable: failed || bits & (EPOLLIN | EPOLLRDHUP) as u32 != 0,
        writable: failed || bits & EPOLLOUT as u32 != 0,
    }
}

/// `None` blocks forever. Sub-millisecond waits round up so a timer due
/// in 0.4ms does not turn into a busy loop on a zero timeout.
fn timeout_millis(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(t) => t.as_micros().div_ceil(1000).min(i32::MAX as u128) as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hang_up_wakes_both_directions() {
        let event = readiness(7, EPOLLHUP as u32);
        assert!(event.readable && event.writable);

        let event = readiness(7, EPOLLOUT as u32);
        assert!(!event.readable && event.writable);
    }

    #[test]
    fn timeouts_round_up_to_whole_milliseconds() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::from_micros(400))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_millis(30))), 30);
    }

    #[test]
    fn wake_interrupts_a_blocking_poll() {
        let mut poller = EpollPoller::new().unwrap();
        let mut events = Vec::new();

        poller.waker().wake();
        poller.poll(&mut events, Some(Duration::from_secs(5))).unwrap();

        assert!(events.is_empty());
    }
}
