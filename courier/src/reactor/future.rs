use crate::reactor::ReactorHandle;
use crate::reactor::command::Command;
use crate::reactor::poller::common::Interest;
use crate::reactor::poller::platform::{
    sys_accept, sys_connect, sys_get_socket_error, sys_peername, sys_read, sys_write,
};
use crate::runtime::context::{current_queue, current_reactor};
use crate::runtime::queue::QueueHandle;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

/// Interest of one future in one direction of a descriptor.
///
/// Readiness wakers are one-shot, so the registration is re-armed every
/// time the owning future returns `Pending`. While armed it counts as
/// an outstanding wake source in the census. Dropping it withdraws the
/// interest from the reactor.
pub(crate) struct Registration {
    fd: RawFd,
    interest: Interest,
    armed: Option<Armed>,
}

struct Armed {
    reactor: ReactorHandle,
    census: Option<QueueHandle>,
}

impl Registration {
    pub(crate) fn new(fd: RawFd, interest: Interest) -> Self {
        Self {
            fd,
            interest,
            armed: None,
        }
    }

    /// Asks the reactor to wake `waker` when the descriptor is ready.
    pub(crate) fn arm(&mut self, waker: &Waker) -> io::Result<()> {
        let armed = match self.armed.take() {
            Some(armed) => armed,
            None => {
                let reactor = current_reactor()
                    .ok_or_else(|| io::Error::other("I/O polled outside of runtime"))?;

                let census = current_queue();
                if let Some(queue) = &census {
                    queue.census().io += 1;
                }

                Armed { reactor, census }
            }
        };

        let sent = armed.reactor.send(Command::Register {
            fd: self.fd,
            interest: self.interest,
            waker: waker.clone(),
        });
        self.armed = Some(armed);

        sent.map_err(|_| io::Error::other("reactor has shut down"))
    }

    /// Withdraws the interest, if it was ever armed.
    pub(crate) fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            let _ = armed.reactor.send(Command::Deregister {
                fd: self.fd,
                interest: self.interest,
            });

            if let Some(queue) = armed.census {
                queue.census().io -= 1;
            }
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Reads whatever is available into `buffer`.
///
/// Resolves with `Ok(0)` at end of stream. The descriptor must be in
/// non-blocking mode.
pub(crate) struct ReadFuture<'a> {
    fd: RawFd,
    buffer: &'a mut [u8],
    registration: Registration,
}

impl<'a> ReadFuture<'a> {
    pub(crate) fn new(fd: RawFd, buffer: &'a mut [u8]) -> Self {
        Self {
            fd,
            buffer,
            registration: Registration::new(fd, Interest::READ),
        }
    }
}

impl Future for ReadFuture<'_> {
    type Output = io::Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            let n = sys_read(this.fd, this.buffer);

            if n >= 0 {
                this.registration.disarm();
                return Poll::Ready(Ok(n as usize));
            }

            let err = io::Error::last_os_error();

            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => {
                    if let Err(err) = this.registration.arm(cx.waker()) {
                        return Poll::Ready(Err(err));
                    }
                    return Poll::Pending;
                }
                _ => {
                    this.registration.disarm();
                    return Poll::Ready(Err(err));
                }
            }
        }
    }
}

/// Writes as much of `buffer` as the socket accepts in one go.
///
/// Resolves with the number of bytes written, at least one unless the
/// buffer is empty.
pub(crate) struct WriteFuture<'a> {
    fd: RawFd,
    buffer: &'a [u8],
    registration: Registration,
}

impl<'a> WriteFuture<'a> {
    pub(crate) fn new(fd: RawFd, buffer: &'a [u8]) -> Self {
        Self {
            fd,
            buffer,
            registration: Registration::new(fd, Interest::WRITE),
        }
    }
}

impl Future for WriteFuture<'_> {
    type Output = io::Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.buffer.is_empty() {
            return Poll::Ready(Ok(0));
        }

        loop {
            let n = sys_write(this.fd, this.buffer);

            if n > 0 {
                this.registration.disarm();
                return Poll::Ready(Ok(n as usize));
            }

            if n == 0 {
                this.registration.disarm();
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }

            let err = io::Error::last_os_error();

            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => {
                    if let Err(err) = this.registration.arm(cx.waker()) {
                        return Poll::Ready(Err(err));
                    }
                    return Poll::Pending;
                }
                _ => {
                    this.registration.disarm();
                    return Poll::Ready(Err(err));
                }
            }
        }
    }
}

/// Accepts one connection on a listening socket.
///
/// Resolves with the new, already non-blocking, descriptor and the
/// peer address.
pub(crate) struct AcceptFuture {
    fd: RawFd,
    registration: Registration,
}

impl AcceptFuture {
    pub(crate) fn new(fd: RawFd) -> Self {
        Self {
            fd,
            registration: Registration::new(fd, Interest::READ),
        }
    }
}

impl Future for AcceptFuture {
    type Output = io::Result<(RawFd, SocketAddr)>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match sys_accept(this.fd) {
            Ok(accepted) => {
                this.registration.disarm();
                Poll::Ready(Ok(accepted))
            }

            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                match this.registration.arm(cx.waker()) {
                    Ok(()) => Poll::Pending,
                    Err(err) => Poll::Ready(Err(err)),
                }
            }

            Err(err) => {
                this.registration.disarm();
                Poll::Ready(Err(err))
            }
        }
    }
}

/// Non-blocking connect.
///
/// The first poll starts the connection; once the socket reports
/// writable, `SO_ERROR` tells whether it succeeded.
pub(crate) struct ConnectFuture {
    fd: RawFd,
    addr: SocketAddr,
    started: bool,
    registration: Registration,
}

impl ConnectFuture {
    pub(crate) fn new(fd: RawFd, addr: SocketAddr) -> Self {
        Self {
            fd,
            addr,
            started: false,
            registration: Registration::new(fd, Interest::WRITE),
        }
    }
}

impl Future for ConnectFuture {
    type Output = io::Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if !this.started {
            this.started = true;

            match sys_connect(this.fd, &this.addr) {
                Ok(()) => return Poll::Ready(Ok(())),
                Err(err) if err.raw_os_error() == Some(libc::EINPROGRESS) => {}
                Err(err) => return Poll::Ready(Err(err)),
            }
        } else {
            // A writable socket may still be connecting if the wake-up came
            // from elsewhere; only trust SO_ERROR once the peer address is set.
            match sys_get_socket_error(this.fd) {
                Ok(()) => {
                    if sys_peername(this.fd).is_ok() {
                        this.registration.disarm();
                        return Poll::Ready(Ok(()));
                    }
                }
                Err(err) => {
                    this.registration.disarm();
                    return Poll::Ready(Err(err));
                }
            }
        }

        match this.registration.arm(cx.waker()) {
            Ok(()) => Poll::Pending,
            Err(err) => Poll::Ready(Err(err)),
        }
    }
}
