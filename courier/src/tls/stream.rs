use super::{Role, TlsContext, TlsError};
use crate::stream::Stream;

use rustls::Connection;

use std::io::{self, Read, Write};

/// Bytes of plaintext pulled from the engine at a time.
const PLAINTEXT_CHUNK: usize = 4096;

/// Where a [`TlsStream`] stands in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// No operation has touched the stream yet.
    NotStarted,
    Handshaking,
    Established,
    /// A transport or protocol error ended the session for good.
    Failed,
}

/// A TLS session layered over another stream.
///
/// The handshake starts with the first operation, or explicitly with
/// [`handshake`](Self::handshake). Ciphertext produced by the engine is
/// always pushed to the raw stream before the next read from it.
///
/// # Examples
///
/// ```rust,ignore
/// let raw = TcpStream::connect("127.0.0.1:8443").await?;
/// let context = TlsContext::client(config, ServerName::try_from("localhost")?);
///
/// let mut tls = TlsStream::client(context, raw)?;
/// tls.send(b"hello").await?;
/// let reply = tls.receive().await?;
/// ```
pub struct TlsStream<S: Stream> {
    raw: S,
    context: TlsContext,
    engine: Connection,
    state: HandshakeState,

    /// Ciphertext received but not yet taken by the engine.
    incoming: Vec<u8>,

    /// Ciphertext produced by the engine but not yet sent.
    outgoing: Vec<u8>,

    /// Decrypted bytes not yet handed to the caller.
    plaintext: Vec<u8>,

    /// Set once the peer's `close_notify` has been read.
    peer_closed: bool,
    closed: bool,
}

impl<S: Stream> TlsStream<S> {
    /// Wraps `raw` in the role `context` was built for.
    pub fn new(context: TlsContext, raw: S) -> Result<Self, TlsError> {
        let engine = context.connection()?;

        Ok(Self {
            raw,
            context,
            engine,
            state: HandshakeState::NotStarted,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            plaintext: Vec::new(),
            peer_closed: false,
            closed: false,
        })
    }

    /// Wraps `raw` as the client side. Fails for a server context.
    pub fn client(context: TlsContext, raw: S) -> Result<Self, TlsError> {
        Self::with_role(Role::Client, context, raw)
    }

    /// Wraps `raw` as the server side. Fails for a client context.
    pub fn server(context: TlsContext, raw: S) -> Result<Self, TlsError> {
        Self::with_role(Role::Server, context, raw)
    }

    fn with_role(expected: Role, context: TlsContext, raw: S) -> Result<Self, TlsError> {
        let found = context.role();
        if found != expected {
            return Err(TlsError::UnsupportedContext { expected, found });
        }

        Self::new(context, raw)
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn context(&self) -> &TlsContext {
        &self.context
    }

    /// The stream carrying the ciphertext.
    pub fn get_ref(&self) -> &S {
        &self.raw
    }

    /// The negotiated ALPN protocol, once established.
    pub fn alpn_protocol(&self) -> Option<&[u8]> {
        self.engine.alpn_protocol()
    }

    /// Runs the handshake to completion. Does nothing once established.
    pub async fn handshake(&mut self) -> Result<(), TlsError> {
        self.check_usable()?;
        let result = self.drive_handshake().await;
        self.settle(result).await
    }

    /// Receives the next non-empty chunk of plaintext.
    ///
    /// Fails with [`TlsError::Closed`] once the peer has sent
    /// `close_notify` and everything before it was delivered.
    pub async fn receive(&mut self) -> Result<Vec<u8>, TlsError> {
        self.check_usable()?;
        let result = self.read_plaintext().await;
        self.settle(result).await
    }

    /// Encrypts and sends all of `data`, completing the handshake first
    /// if needed.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), TlsError> {
        self.check_usable()?;
        let result = self.write_plaintext(data).await;
        self.settle(result).await
    }

    /// Sends `close_notify` and closes the raw stream.
    pub async fn shutdown(&mut self) -> Result<(), TlsError> {
        if self.closed {
            return Ok(());
        }

        let result = if self.state == HandshakeState::Established {
            self.engine.send_close_notify();
            self.drain_engine();
            self.flush().await
        } else {
            Ok(())
        };

        self.close();
        result
    }

    /// Closes the raw stream without notifying the peer.
    pub fn close(&mut self) {
        if std::mem::replace(&mut self.closed, true) {
            return;
        }

        tracing::debug!(role = %self.context.role(), "closing TLS stream");
        self.raw.close();
    }

    fn check_usable(&self) -> Result<(), TlsError> {
        if self.closed {
            return Err(TlsError::Closed);
        }
        if self.state == HandshakeState::Failed {
            return Err(TlsError::Failed);
        }
        Ok(())
    }

    /// Records the outcome of an operation.
    ///
    /// Any error but a clean close fails the session. An alert the
    /// engine queued for the peer is sent on a best-effort basis.
    async fn settle<T>(&mut self, result: Result<T, TlsError>) -> Result<T, TlsError> {
        match &result {
            Ok(_) | Err(TlsError::Closed) => {}
            Err(err) => {
                tracing::warn!(role = %self.context.role(), error = %err, "TLS session failed");

                let alert_pending = matches!(err, TlsError::Engine(_)) && !self.outgoing.is_empty();
                self.state = HandshakeState::Failed;

                if alert_pending {
                    let alert = std::mem::take(&mut self.outgoing);
                    let _ = self.raw.send(&alert).await;
                }
            }
        }

        result
    }

    /// Moves `NotStarted` to `Handshaking`, queueing the first flight.
    fn start(&mut self) {
        if self.state == HandshakeState::NotStarted {
            tracing::debug!(role = %self.context.role(), "TLS handshake started");

            self.state = HandshakeState::Handshaking;
            self.drain_engine();
        }
    }

    fn mark_established(&mut self) {
        if self.state == HandshakeState::Handshaking && !self.engine.is_handshaking() {
            tracing::debug!(
                role = %self.context.role(),
                version = ?self.engine.protocol_version(),
                "TLS handshake complete"
            );

            self.state = HandshakeState::Established;
        }
    }

    async fn drive_handshake(&mut self) -> Result<(), TlsError> {
        self.start();

        while self.engine.is_handshaking() {
            self.flush().await?;
            self.pull().await?;
        }

        // The last flight (e.g. the client's Finished) is still queued.
        self.flush().await?;
        self.mark_established();

        Ok(())
    }

    async fn read_plaintext(&mut self) -> Result<Vec<u8>, TlsError> {
        self.start();

        loop {
            self.flush().await?;
            self.mark_established();

            if !self.plaintext.is_empty() {
                return Ok(std::mem::take(&mut self.plaintext));
            }

            if self.peer_closed {
                return Err(TlsError::Closed);
            }

            self.pull().await?;
        }
    }

    async fn write_plaintext(&mut self, data: &[u8]) -> Result<(), TlsError> {
        self.drive_handshake().await?;

        let mut rest = data;
        while !rest.is_empty() {
            let n = self.engine.writer().write(rest)?;
            rest = &rest[n..];

            self.drain_engine();
            self.flush().await?;
        }

        Ok(())
    }

    /// Receives one chunk from the raw stream and feeds it to the engine.
    async fn pull(&mut self) -> Result<(), TlsError> {
        let chunk = self.raw.receive().await.map_err(TlsError::transport)?;
        self.incoming.extend_from_slice(&chunk);

        while !self.incoming.is_empty() {
            let consumed = self.engine.read_tls(&mut self.incoming.as_slice())?;
            self.incoming.drain(..consumed);

            let processed = self.engine.process_new_packets();
            // Queued alerts go out even when processing failed.
            self.drain_engine();
            processed?;

            self.drain_plaintext()?;

            if consumed == 0 {
                break;
            }
        }

        Ok(())
    }

    fn drain_plaintext(&mut self) -> Result<(), TlsError> {
        let mut chunk = [0u8; PLAINTEXT_CHUNK];

        loop {
            match self.engine.reader().read(&mut chunk) {
                Ok(0) => {
                    self.peer_closed = true;
                    return Ok(());
                }
                Ok(n) => self.plaintext.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Moves every pending record out of the engine.
    fn drain_engine(&mut self) {
        while self.engine.wants_write() {
            // Writing into a Vec cannot fail.
            if self.engine.write_tls(&mut self.outgoing).is_err() {
                break;
            }
        }
    }

    /// Sends the queued ciphertext through the raw stream.
    async fn flush(&mut self) -> Result<(), TlsError> {
        if self.outgoing.is_empty() {
            return Ok(());
        }

        let records = std::mem::take(&mut self.outgoing);
        self.raw.send(&records).await.map_err(TlsError::transport)
    }
}

impl<S: Stream> Stream for TlsStream<S> {
    type Error = TlsError;

    async fn receive(&mut self) -> Result<Vec<u8>, TlsError> {
        TlsStream::receive(self).await
    }

    async fn send<'a>(&'a mut self, data: &'a [u8]) -> Result<(), TlsError> {
        TlsStream::send(self, data).await
    }

    fn close(&mut self) {
        TlsStream::close(self);
    }

    /// A new session, with the same context, over `raw.pipe()`.
    fn pipe(&self) -> Result<Self, TlsError> {
        let raw = self.raw.pipe().map_err(TlsError::transport)?;
        Self::new(self.context.clone(), raw)
    }
}
