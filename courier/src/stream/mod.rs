//! The byte stream contract shared by every transport.
//!
//! A [`Stream`] moves opaque byte chunks. [`TcpStream`](crate::net::TcpStream)
//! implements it over a socket, [`TlsStream`](crate::tls::TlsStream) over
//! any other stream, and [`duplex`] provides an in-process pair.

mod memory;

pub use memory::{MemoryStream, StreamClosed, duplex};

use std::error::Error;
use std::future::Future;

/// A bidirectional byte stream.
///
/// Every operation takes `&mut self`, so a stream serves one call at a
/// time. Each call yields exactly one outcome: the result, or the error
/// that ended it.
pub trait Stream: Send + Sized {
    type Error: Error + Send + Sync + 'static;

    /// Receives the next chunk of bytes. A successful chunk is never
    /// empty.
    fn receive(&mut self) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send + '_;

    /// Sends all of `data`, including whatever buffering the transport
    /// needs to push it out.
    fn send<'a>(&'a mut self, data: &'a [u8])
    -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

    /// Releases the transport. Calling it again does nothing.
    fn close(&mut self);

    /// Opens another handle on the same transport, layered the same way.
    fn pipe(&self) -> Result<Self, Self::Error>;
}
