use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, Connection, ServerConfig, ServerConnection};

use std::fmt;
use std::sync::Arc;

/// Which side of the handshake a context drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Server => f.write_str("server"),
        }
    }
}

/// Configuration shared by every TLS session of one role.
///
/// Cheap to clone: the rustls configuration sits behind an `Arc`.
#[derive(Clone)]
pub enum TlsContext {
    Client {
        config: Arc<ClientConfig>,
        server_name: ServerName<'static>,
    },
    Server {
        config: Arc<ServerConfig>,
    },
}

impl TlsContext {
    /// A client context verifying the peer as `server_name`.
    pub fn client(config: Arc<ClientConfig>, server_name: ServerName<'static>) -> Self {
        TlsContext::Client {
            config,
            server_name,
        }
    }

    pub fn server(config: Arc<ServerConfig>) -> Self {
        TlsContext::Server { config }
    }

    pub fn role(&self) -> Role {
        match self {
            TlsContext::Client { .. } => Role::Client,
            TlsContext::Server { .. } => Role::Server,
        }
    }

    /// Starts a fresh session.
    pub(crate) fn connection(&self) -> Result<Connection, rustls::Error> {
        Ok(match self {
            TlsContext::Client {
                config,
                server_name,
            } => ClientConnection::new(config.clone(), server_name.clone())?.into(),
            TlsContext::Server { config } => ServerConnection::new(config.clone())?.into(),
        })
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsContext::Client { server_name, .. } => f
                .debug_struct("TlsContext::Client")
                .field("server_name", server_name)
                .finish_non_exhaustive(),
            TlsContext::Server { .. } => f.debug_struct("TlsContext::Server").finish_non_exhaustive(),
        }
    }
}
