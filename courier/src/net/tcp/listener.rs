use super::stream::{TcpStream, close_fd};
use crate::reactor::future::AcceptFuture;
use crate::reactor::poller::platform::{
    parse_address, sys_listen, sys_set_nonblocking, sys_set_reuseaddr, sys_socket, sys_sockname,
};

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, RawFd};

/// A TCP socket server, listening for connections.
///
/// # Examples
///
/// ```rust,ignore
/// let listener = TcpListener::bind("127.0.0.1:0")?;
/// println!("listening on port {}", listener.port()?);
///
/// loop {
///     let (stream, peer) = listener.accept().await?;
///     courier::task::spawn(serve(stream, peer));
/// }
/// ```
pub struct TcpListener {
    fd: RawFd,
}

impl TcpListener {
    /// Binds to `address`, e.g. `"127.0.0.1:8080"` or `"[::]:0"`.
    ///
    /// The socket has `SO_REUSEADDR` set, and an IPv6 wildcard address
    /// also accepts IPv4 connections.
    pub fn bind(address: &str) -> io::Result<Self> {
        let addr = parse_address(address)?;

        let listener = Self {
            fd: sys_socket(&addr)?,
        };

        sys_set_reuseaddr(listener.fd)?;
        sys_listen(listener.fd, &addr)?;

        tracing::debug!(fd = listener.fd, address, "listening");

        Ok(listener)
    }

    /// Waits for the next connection.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (fd, peer) = AcceptFuture::new(self.fd).await?;

        tracing::debug!(fd, %peer, "accepted");

        Ok((TcpStream::from_fd(fd), peer))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        sys_sockname(self.fd)
    }

    /// The port this listener is bound to; useful after binding port 0.
    pub fn port(&self) -> io::Result<u16> {
        Ok(self.local_addr()?.port())
    }
}

impl Drop for TcpListener {
    fn drop(&mut self) {
        if self.fd >= 0 {
            close_fd(self.fd);
        }
    }
}

impl AsRawFd for TcpListener {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl IntoRawFd for TcpListener {
    fn into_raw_fd(mut self) -> RawFd {
        std::mem::replace(&mut self.fd, -1)
    }
}

impl FromRawFd for TcpListener {
    /// Adopts a listening socket and switches it to non-blocking mode.
    unsafe fn from_raw_fd(fd: RawFd) -> Self {
        if let Err(err) = sys_set_nonblocking(fd) {
            tracing::warn!(fd, error = %err, "adopted listener stays blocking");
        }
        Self { fd }
    }
}
