//! TCP networking.
//!
//! [`TcpListener`] and [`TcpStream`] are non-blocking sockets driven by
//! the runtime reactor. They must be used from inside a runtime.

mod error;
mod tcp;

pub use error::SocketError;
pub use tcp::listener::TcpListener;
pub use tcp::stream::{ReadHalf, TcpStream, WRITE_BUFFER_CAPACITY, WriteHalf};
