//! # Courier
//!
//! **Courier** is a cooperative runtime for network services built
//! around two ideas: tasks that talk through typed channels, and byte
//! streams whose every blocking call has a deadline.
//!
//! - A **scheduler** with a single FIFO run queue, so tasks run in the
//!   order they became runnable, and a deadlock detector that aborts
//!   the process instead of letting it hang.
//! - **Channels** ([`sync::Channel`]), buffered or rendezvous, with close
//!   semantics and async iteration.
//! - A **stream contract** ([`stream::Stream`]) implemented by
//!   [`net::TcpStream`], [`tls::TlsStream`] and in-memory pairs.
//! - **Deadlines** ([`time::Deadline`]) measured on an injectable clock.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::net::{TcpListener, TcpStream};
//! use courier::sync::Channel;
//! use courier::time::Deadline;
//!
//! #[courier::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:0").unwrap();
//!     let address = listener.local_addr().unwrap().to_string();
//!
//!     let done = Channel::new();
//!     let tx = done.sender();
//!     courier::task::spawn(async move {
//!         let (mut stream, _) = listener.accept().await.unwrap();
//!         let line = stream.receive_until(b"\n", 64, Deadline::Never).await.unwrap();
//!         tx.send(line).await.unwrap();
//!     });
//!
//!     let mut client = TcpStream::connect(&address).await.unwrap();
//!     client.send(b"hello\n", Deadline::Never).await.unwrap();
//!     client.flush(Deadline::Never).await.unwrap();
//!
//!     assert_eq!(done.receive().await.unwrap(), b"hello\n");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`]: spawning and joining tasks
//! - [`sync`]: channels
//! - [`time`]: clocks, deadlines, sleep and timeouts
//! - [`stream`]: the stream contract and in-memory streams
//! - [`net`]: TCP listener and stream
//! - [`tls`]: TLS over any stream

mod reactor;
mod runtime;

pub mod net;
pub mod stream;
pub mod sync;
pub mod time;
pub mod tls;

pub use runtime::Runtime;
pub use runtime::builder::RuntimeBuilder;
pub use runtime::task;
pub use runtime::yield_now::yield_now;

pub use courier_macros::{main, test};
