use std::io;
use std::os::fd::RawFd;

/// Readiness directions a registration cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl Interest {
    pub(crate) const READ: Interest = Interest {
        read: true,
        write: false,
    };

    pub(crate) const WRITE: Interest = Interest {
        read: false,
        write: true,
    };

    /// Returns `true` if neither direction is requested.
    pub(crate) fn is_empty(self) -> bool {
        !self.read && !self.write
    }
}

/// Interrupts a blocked poller from any thread.
///
/// Backed by a non-blocking `eventfd`: every `wake` bumps its counter,
/// and the poller resets it once it has woken up.
pub(crate) struct Waker(RawFd);

impl Waker {
    pub(crate) fn new() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Waker(fd))
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.0
    }

    pub(crate) fn wake(&self) {
        let one: u64 = 1;
        // A full counter already guarantees a wake-up.
        unsafe { libc::write(self.0, (&one as *const u64).cast(), size_of::<u64>()) };
    }

    pub(crate) fn reset(&self) {
        let mut count: u64 = 0;
        unsafe { libc::read(self.0, (&mut count as *mut u64).cast(), size_of::<u64>()) };
    }
}

impl Drop for Waker {
    fn drop(&mut self) {
        unsafe { libc::close(self.0) };
    }
}
