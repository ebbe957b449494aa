use crate::net::SocketError;
use crate::reactor::command::Command;
use crate::reactor::future::{ConnectFuture, ReadFuture, WriteFuture};
use crate::reactor::poller::platform::{
    parse_address, sys_close, sys_dup, sys_peername, sys_set_nonblocking, sys_shutdown, sys_socket,
    sys_sockname,
};
use crate::runtime::context::current_reactor;
use crate::stream::Stream;
use crate::time::{Deadline, timeout_at};

use std::net::{Shutdown, SocketAddr};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, RawFd};

/// Outbound bytes are buffered up to this size before `send` writes.
pub const WRITE_BUFFER_CAPACITY: usize = 4096;

/// Bytes asked from the kernel per read.
const READ_CHUNK: usize = 4096;

/// An asynchronous, buffered TCP connection.
///
/// Reads go through an inbound buffer, so bytes received past a
/// delimiter are kept for the next call. Writes accumulate in an
/// outbound buffer until it fills up or [`flush`](Self::flush) is
/// called.
///
/// Every blocking operation takes a [`Deadline`]. When it expires the
/// operation fails with [`SocketError::Timeout`] carrying whatever was
/// read so far, and the stream can be used again.
///
/// # Examples
///
/// ```rust,ignore
/// let mut stream = TcpStream::connect("127.0.0.1:8080").await?;
///
/// stream.send(b"PING\n", Deadline::Never).await?;
/// stream.flush(Deadline::after(Duration::from_secs(1))).await?;
///
/// let line = stream.receive_until(b"\n", 1024, Deadline::Never).await?;
/// ```
pub struct TcpStream {
    /// `None` once closed.
    fd: Option<RawFd>,
    inbound: Inbound,
    outbound: Outbound,
}

impl TcpStream {
    pub(crate) fn from_fd(fd: RawFd) -> Self {
        Self {
            fd: Some(fd),
            inbound: Inbound::default(),
            outbound: Outbound::default(),
        }
    }

    /// Connects to `address`, e.g. `"127.0.0.1:8080"` or `"[::1]:8080"`.
    pub async fn connect(address: &str) -> Result<Self, SocketError> {
        Self::connect_with_deadline(address, Deadline::Never).await
    }

    /// Connects to `address`, giving up at `deadline`.
    pub async fn connect_with_deadline(
        address: &str,
        deadline: Deadline,
    ) -> Result<Self, SocketError> {
        let addr = parse_address(address)?;
        let fd = sys_socket(&addr)?;

        // Owned from here on, so every failure below closes the socket.
        let stream = Self::from_fd(fd);

        match timeout_at(deadline, ConnectFuture::new(fd, addr)).await {
            Ok(Ok(())) => {
                tracing::debug!(fd, %addr, "connected");
                Ok(stream)
            }
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(SocketError::Timeout { data: Vec::new() }),
        }
    }

    fn fd(&self) -> Result<RawFd, SocketError> {
        self.fd.ok_or(SocketError::Closed)
    }

    /// Buffers `data` for sending.
    ///
    /// If the buffer cannot take `data`, it is flushed first. Payloads
    /// larger than [`WRITE_BUFFER_CAPACITY`] go out before this returns.
    pub async fn send(&mut self, data: &[u8], deadline: Deadline) -> Result<(), SocketError> {
        let fd = self.fd()?;
        self.outbound.send(fd, data, deadline).await
    }

    /// Writes out everything buffered by [`send`](Self::send).
    pub async fn flush(&mut self, deadline: Deadline) -> Result<(), SocketError> {
        let fd = self.fd()?;
        self.outbound.flush(fd, deadline).await
    }

    /// Receives exactly `size` bytes.
    pub async fn receive(&mut self, size: usize, deadline: Deadline) -> Result<Vec<u8>, SocketError> {
        let fd = self.fd()?;
        self.inbound.receive(fd, size, deadline).await
    }

    /// Receives up to and including the first `delimiter`.
    ///
    /// Fails with [`SocketError::NoBufferSpace`] carrying exactly `max`
    /// bytes if that many arrive without the delimiter.
    pub async fn receive_until(
        &mut self,
        delimiter: &[u8],
        max: usize,
        deadline: Deadline,
    ) -> Result<Vec<u8>, SocketError> {
        let fd = self.fd()?;
        self.inbound.receive_until(fd, delimiter, max, deadline).await
    }

    /// Receives whatever is available: at least one byte, at most `max`.
    pub async fn receive_some(&mut self, max: usize, deadline: Deadline) -> Result<Vec<u8>, SocketError> {
        let fd = self.fd()?;
        self.inbound.receive_some(fd, max, deadline).await
    }

    /// Splits the stream so a receive and a send can run concurrently.
    pub fn split(&mut self) -> (ReadHalf<'_>, WriteHalf<'_>) {
        (
            ReadHalf {
                fd: self.fd,
                inbound: &mut self.inbound,
            },
            WriteHalf {
                fd: self.fd,
                outbound: &mut self.outbound,
            },
        )
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(sys_peername(self.fd()?)?)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(sys_sockname(self.fd()?)?)
    }

    /// Shuts down the read, write, or both halves of the connection.
    pub fn shutdown(&self, how: Shutdown) -> Result<(), SocketError> {
        Ok(sys_shutdown(self.fd()?, how)?)
    }

    /// Closes the socket. Buffered outbound bytes that were not flushed
    /// are discarded.
    pub fn close(&mut self) {
        if let Some(fd) = self.fd.take() {
            tracing::debug!(fd, "closing stream");
            close_fd(fd);
        }

        self.inbound.buffer.clear();
        self.outbound.buffer.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.fd.is_none()
    }
}

impl Drop for TcpStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl Stream for TcpStream {
    type Error = SocketError;

    async fn receive(&mut self) -> Result<Vec<u8>, SocketError> {
        self.receive_some(READ_CHUNK, Deadline::Never).await
    }

    async fn send<'a>(&'a mut self, data: &'a [u8]) -> Result<(), SocketError> {
        TcpStream::send(self, data, Deadline::Never).await?;
        self.flush(Deadline::Never).await
    }

    fn close(&mut self) {
        TcpStream::close(self);
    }

    /// A second stream on a duplicate of the socket, with its own buffers.
    fn pipe(&self) -> Result<Self, SocketError> {
        Ok(Self::from_fd(sys_dup(self.fd()?)?))
    }
}

impl AsRawFd for TcpStream {
    /// Returns `-1` once the stream is closed.
    fn as_raw_fd(&self) -> RawFd {
        self.fd.unwrap_or(-1)
    }
}

impl IntoRawFd for TcpStream {
    /// Detaches the socket; buffered bytes are dropped.
    fn into_raw_fd(mut self) -> RawFd {
        self.fd.take().unwrap_or(-1)
    }
}

impl FromRawFd for TcpStream {
    /// Adopts a connected socket and switches it to non-blocking mode.
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        if let Err(err) = sys_set_nonblocking(fd) {
            tracing::warn!(fd, error = %err, "adopted socket stays blocking");
        }
        Self::from_fd(fd)
    }
}

/// The receiving half of a [`TcpStream`].
pub struct ReadHalf<'a> {
    fd: Option<RawFd>,
    inbound: &'a mut Inbound,
}

impl ReadHalf<'_> {
    pub async fn receive(&mut self, size: usize, deadline: Deadline) -> Result<Vec<u8>, SocketError> {
        let fd = self.fd.ok_or(SocketError::Closed)?;
        self.inbound.receive(fd, size, deadline).await
    }

    pub async fn receive_until(
        &mut self,
        delimiter: &[u8],
        max: usize,
        deadline: Deadline,
    ) -> Result<Vec<u8>, SocketError> {
        let fd = self.fd.ok_or(SocketError::Closed)?;
        self.inbound.receive_until(fd, delimiter, max, deadline).await
    }

    pub async fn receive_some(&mut self, max: usize, deadline: Deadline) -> Result<Vec<u8>, SocketError> {
        let fd = self.fd.ok_or(SocketError::Closed)?;
        self.inbound.receive_some(fd, max, deadline).await
    }
}

/// The sending half of a [`TcpStream`].
pub struct WriteHalf<'a> {
    fd: Option<RawFd>,
    outbound: &'a mut Outbound,
}

impl WriteHalf<'_> {
    pub async fn send(&mut self, data: &[u8], deadline: Deadline) -> Result<(), SocketError> {
        let fd = self.fd.ok_or(SocketError::Closed)?;
        self.outbound.send(fd, data, deadline).await
    }

    pub async fn flush(&mut self, deadline: Deadline) -> Result<(), SocketError> {
        let fd = self.fd.ok_or(SocketError::Closed)?;
        self.outbound.flush(fd, deadline).await
    }
}

/// Closes `fd` through the reactor so its registration goes first.
///
/// Without a reactor (outside a runtime, or after shutdown) nothing can
/// be registered any more and the descriptor is closed directly.
pub(crate) fn close_fd(fd: RawFd) {
    let sent = match current_reactor() {
        Some(reactor) => reactor.send(Command::Close { fd }).is_ok(),
        None => false,
    };

    if !sent {
        sys_close(fd);
    }
}

/// Received bytes not yet handed to the caller.
#[derive(Default)]
struct Inbound {
    buffer: Vec<u8>,
}

impl Inbound {
    /// Reads one chunk from the socket into the buffer.
    ///
    /// On failure the returned error carries no data; callers attach
    /// the bytes they give up on.
    async fn fill(&mut self, fd: RawFd, deadline: Deadline) -> Result<(), SocketError> {
        let start = self.buffer.len();
        self.buffer.resize(start + READ_CHUNK, 0);

        let read = timeout_at(deadline, ReadFuture::new(fd, &mut self.buffer[start..])).await;

        let outcome = match read {
            Ok(Ok(0)) => Err(SocketError::ConnectionReset { data: Vec::new() }),
            Ok(Ok(n)) => {
                self.buffer.truncate(start + n);
                return Ok(());
            }
            Ok(Err(err)) => Err(SocketError::from(err)),
            Err(_) => Err(SocketError::Timeout { data: Vec::new() }),
        };

        self.buffer.truncate(start);
        outcome
    }

    /// Fails with everything buffered so far attached to `err`.
    fn give_up(&mut self, err: SocketError) -> SocketError {
        err.with_data(std::mem::take(&mut self.buffer))
    }

    async fn receive(&mut self, fd: RawFd, size: usize, deadline: Deadline) -> Result<Vec<u8>, SocketError> {
        while self.buffer.len() < size {
            if let Err(err) = self.fill(fd, deadline).await {
                return Err(self.give_up(err));
            }
        }

        Ok(self.buffer.drain(..size).collect())
    }

    async fn receive_until(
        &mut self,
        fd: RawFd,
        delimiter: &[u8],
        max: usize,
        deadline: Deadline,
    ) -> Result<Vec<u8>, SocketError> {
        if delimiter.is_empty() {
            return Err(SocketError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty delimiter",
            )));
        }

        let mut scanned: usize = 0;

        loop {
            let window = &self.buffer[..self.buffer.len().min(max)];

            // Resume the scan where the previous pass could not match.
            let from = scanned.saturating_sub(delimiter.len() - 1);
            if let Some(pos) = find(&window[from..], delimiter) {
                let end = from + pos + delimiter.len();
                return Ok(self.buffer.drain(..end).collect());
            }
            scanned = window.len();

            if self.buffer.len() >= max {
                return Err(SocketError::NoBufferSpace {
                    data: self.buffer.drain(..max).collect(),
                });
            }

            if let Err(err) = self.fill(fd, deadline).await {
                return Err(self.give_up(err));
            }
        }
    }

    async fn receive_some(&mut self, fd: RawFd, max: usize, deadline: Deadline) -> Result<Vec<u8>, SocketError> {
        if max == 0 {
            return Ok(Vec::new());
        }

        if self.buffer.is_empty() {
            self.fill(fd, deadline).await?;
        }

        let n = self.buffer.len().min(max);
        Ok(self.buffer.drain(..n).collect())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Bytes accepted by `send` but not yet written.
#[derive(Default)]
struct Outbound {
    buffer: Vec<u8>,
}

impl Outbound {
    async fn send(&mut self, fd: RawFd, data: &[u8], deadline: Deadline) -> Result<(), SocketError> {
        if self.buffer.len() + data.len() > WRITE_BUFFER_CAPACITY {
            self.flush(fd, deadline).await?;
        }

        self.buffer.extend_from_slice(data);

        if self.buffer.len() > WRITE_BUFFER_CAPACITY {
            self.flush(fd, deadline).await?;
        }

        Ok(())
    }

    /// On timeout the unwritten bytes stay buffered for the next flush.
    async fn flush(&mut self, fd: RawFd, deadline: Deadline) -> Result<(), SocketError> {
        while !self.buffer.is_empty() {
            match timeout_at(deadline, WriteFuture::new(fd, &self.buffer)).await {
                Ok(Ok(n)) => {
                    self.buffer.drain(..n);
                }
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => return Err(SocketError::Timeout { data: Vec::new() }),
            }
        }

        Ok(())
    }
}
