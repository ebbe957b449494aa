//! Thin wrappers over the socket syscalls used by `net`.
//!
//! Every socket created here is non-blocking and close-on-exec.

use libc::{
    AF_INET, AF_INET6, F_DUPFD_CLOEXEC, F_GETFL, F_SETFL, IPPROTO_IPV6, IPV6_V6ONLY, MSG_NOSIGNAL,
    O_NONBLOCK, SO_ERROR, SO_REUSEADDR, SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_STREAM, SOL_SOCKET,
    c_int, c_void, sockaddr, sockaddr_in, sockaddr_in6, sockaddr_storage, socklen_t,
};
use std::net::{Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::fd::RawFd;
use std::{io, mem};

const LISTEN_BACKLOG: c_int = 128;

/// Turns a `-1` return into the current `errno`.
fn cvt(rc: c_int) -> io::Result<c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

/// `recv(2)`. Negative on error, with the cause in `errno`.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> isize {
    unsafe { libc::recv(fd, buffer.as_mut_ptr().cast(), buffer.len(), 0) }
}

/// `send(2)` without `SIGPIPE`: a reset peer shows up as `EPIPE`.
pub(crate) fn sys_write(fd: RawFd, buffer: &[u8]) -> isize {
    unsafe { libc::send(fd, buffer.as_ptr().cast(), buffer.len(), MSG_NOSIGNAL) }
}

pub(crate) fn sys_close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

pub(crate) fn sys_dup(fd: RawFd) -> io::Result<RawFd> {
    cvt(unsafe { libc::fcntl(fd, F_DUPFD_CLOEXEC, 0) })
}

pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = cvt(unsafe { libc::fcntl(fd, F_GETFL) })?;
    cvt(unsafe { libc::fcntl(fd, F_SETFL, flags | O_NONBLOCK) }).map(drop)
}

/// Parses `"ip:port"` or `"[ipv6]:port"`.
pub(crate) fn parse_address(address: &str) -> io::Result<SocketAddr> {
    address.parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid socket address: {address}"),
        )
    })
}

/// Opens a stream socket of the family of `addr`.
///
/// IPv6 sockets are dual stack, so `[::]` also accepts IPv4 peers.
pub(crate) fn sys_socket(addr: &SocketAddr) -> io::Result<RawFd> {
    let family = match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    };

    let fd = cvt(unsafe { libc::socket(family, SOCK_STREAM | SOCK_NONBLOCK | SOCK_CLOEXEC, 0) })?;

    if addr.is_ipv6() {
        if let Err(err) = set_option(fd, IPPROTO_IPV6, IPV6_V6ONLY, 0) {
            sys_close(fd);
            return Err(err);
        }
    }

    Ok(fd)
}

pub(crate) fn sys_set_reuseaddr(fd: RawFd) -> io::Result<()> {
    set_option(fd, SOL_SOCKET, SO_REUSEADDR, 1)
}

fn set_option(fd: RawFd, level: c_int, name: c_int, value: c_int) -> io::Result<()> {
    let len = mem::size_of::<c_int>() as socklen_t;
    let value: *const c_void = (&value as *const c_int).cast();

    cvt(unsafe { libc::setsockopt(fd, level, name, value, len) }).map(drop)
}

/// Binds `fd` to `addr` and starts listening.
pub(crate) fn sys_listen(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = to_raw(addr);
    cvt(unsafe { libc::bind(fd, (&storage as *const sockaddr_storage).cast(), len) })?;
    cvt(unsafe { libc::listen(fd, LISTEN_BACKLOG) }).map(drop)
}

/// Starts a non-blocking connect; expect `EINPROGRESS`.
pub(crate) fn sys_connect(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    let (storage, len) = to_raw(addr);
    cvt(unsafe { libc::connect(fd, (&storage as *const sockaddr_storage).cast(), len) }).map(drop)
}

/// Accepts a connection; the new socket is already non-blocking.
pub(crate) fn sys_accept(fd: RawFd) -> io::Result<(RawFd, SocketAddr)> {
    let mut peer = None;

    let client = cvt(fill_address(&mut peer, |raw, len| unsafe {
        libc::accept4(fd, raw, len, SOCK_NONBLOCK | SOCK_CLOEXEC)
    }))?;

    match peer {
        Some(Ok(addr)) => Ok((client, addr)),
        Some(Err(err)) => {
            sys_close(client);
            Err(err)
        }
        None => {
            sys_close(client);
            Err(io::Error::other("accept returned no peer address"))
        }
    }
}

pub(crate) fn sys_sockname(fd: RawFd) -> io::Result<SocketAddr> {
    query_address(|raw, len| unsafe { libc::getsockname(fd, raw, len) })
}

pub(crate) fn sys_peername(fd: RawFd) -> io::Result<SocketAddr> {
    query_address(|raw, len| unsafe { libc::getpeername(fd, raw, len) })
}

/// Takes the pending `SO_ERROR` of a socket, e.g. the outcome of a
/// non-blocking connect.
pub(crate) fn sys_get_socket_error(fd: RawFd) -> io::Result<()> {
    let mut value: c_int = 0;
    let mut len = mem::size_of::<c_int>() as socklen_t;

    cvt(unsafe {
        libc::getsockopt(
            fd,
            SOL_SOCKET,
            SO_ERROR,
            (&mut value as *mut c_int).cast(),
            &mut len,
        )
    })?;

    match value {
        0 => Ok(()),
        errno => Err(io::Error::from_raw_os_error(errno)),
    }
}

pub(crate) fn sys_shutdown(fd: RawFd, how: Shutdown) -> io::Result<()> {
    let how = match how {
        Shutdown::Read => libc::SHUT_RD,
        Shutdown::Write => libc::SHUT_WR,
        Shutdown::Both => libc::SHUT_RDWR,
    };

    cvt(unsafe { libc::shutdown(fd, how) }).map(drop)
}

/// Runs a `getsockname`-style call and decodes the address it wrote.
fn query_address(
    call: impl FnOnce(*mut sockaddr, *mut socklen_t) -> c_int,
) -> io::Result<SocketAddr> {
    let mut addr = None;
    cvt(fill_address(&mut addr, call))?;
    addr.unwrap_or_else(|| Err(io::Error::other("no address returned")))
}

/// Hands `call` a zeroed `sockaddr_storage`, then decodes it into `out`
/// when the call succeeded.
fn fill_address(
    out: &mut Option<io::Result<SocketAddr>>,
    call: impl FnOnce(*mut sockaddr, *mut socklen_t) -> c_int,
) -> c_int {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;

    let rc = call((&mut storage as *mut sockaddr_storage).cast(), &mut len);
    if rc >= 0 {
        *out = Some(from_raw(&storage));
    }
    rc
}

fn from_raw(storage: &sockaddr_storage) -> io::Result<SocketAddr> {
    match storage.ss_family as c_int {
        AF_INET => {
            // Safety: the family says the storage holds a sockaddr_in.
            let raw = unsafe { &*(storage as *const sockaddr_storage).cast::<sockaddr_in>() };
            let ip = Ipv4Addr::from(u32::from_be(raw.sin_addr.s_addr));

            Ok(SocketAddrV4::new(ip, u16::from_be(raw.sin_port)).into())
        }
        AF_INET6 => {
            // Safety: the family says the storage holds a sockaddr_in6.
            let raw = unsafe { &*(storage as *const sockaddr_storage).cast::<sockaddr_in6>() };
            let ip = Ipv6Addr::from(raw.sin6_addr.s6_addr);

            Ok(SocketAddrV6::new(
                ip,
                u16::from_be(raw.sin6_port),
                raw.sin6_flowinfo,
                raw.sin6_scope_id,
            )
            .into())
        }
        family => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported address family {family}"),
        )),
    }
}

fn to_raw(addr: &SocketAddr) -> (sockaddr_storage, socklen_t) {
    let mut storage: sockaddr_storage = unsafe { mem::zeroed() };

    let len = match addr {
        SocketAddr::V4(v4) => {
            let raw = unsafe { &mut *(&mut storage as *mut sockaddr_storage).cast::<sockaddr_in>() };
            raw.sin_family = AF_INET as _;
            raw.sin_port = v4.port().to_be();
            raw.sin_addr.s_addr = u32::from(*v4.ip()).to_be();
            mem::size_of::<sockaddr_in>()
        }
        SocketAddr::V6(v6) => {
            let raw = unsafe { &mut *(&mut storage as *mut sockaddr_storage).cast::<sockaddr_in6>() };
            raw.sin6_family = AF_INET6 as _;
            raw.sin6_port = v6.port().to_be();
            raw.sin6_addr.s6_addr = v6.ip().octets();
            raw.sin6_flowinfo = v6.flowinfo();
            raw.sin6_scope_id = v6.scope_id();
            mem::size_of::<sockaddr_in6>()
        }
    };

    (storage, len as socklen_t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_addresses_round_trip_both_families() {
        for text in ["127.0.0.1:8080", "[::1]:443"] {
            let addr = parse_address(text).unwrap();
            let (storage, _) = to_raw(&addr);
            assert_eq!(from_raw(&storage).unwrap(), addr);
        }
    }

    #[test]
    fn hostnames_are_rejected() {
        let err = parse_address("localhost:80").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
