//! TLS over any [`Stream`](crate::stream::Stream).
//!
//! The record layer and the cryptography belong to `rustls`; this
//! module only moves ciphertext between the engine and the underlying
//! stream and tracks where the handshake stands.

mod context;
mod error;
mod stream;

pub use context::{Role, TlsContext};
pub use error::TlsError;
pub use stream::{HandshakeState, TlsStream};

pub use rustls;
