use courier::net::{TcpListener, TcpStream};
use courier::stream::{MemoryStream, Stream, duplex};
use courier::task;
use courier::tls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use courier::tls::rustls::{self, ClientConfig, RootCertStore, ServerConfig};
use courier::tls::{HandshakeState, Role, TlsContext, TlsError, TlsStream};
use std::sync::Arc;

const CERT: &[u8] = include_bytes!("fixtures/localhost.cert.der");
const KEY: &[u8] = include_bytes!("fixtures/localhost.key.der");

const ALPN: &[u8] = b"courier/1";

fn server_context() -> TlsContext {
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(KEY.to_vec()));
    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![CertificateDer::from(CERT.to_vec())], key)
        .expect("Failed to build server config");
    config.alpn_protocols = vec![ALPN.to_vec()];

    TlsContext::server(Arc::new(config))
}

fn client_context() -> TlsContext {
    let mut roots = RootCertStore::empty();
    roots
        .add(CertificateDer::from(CERT.to_vec()))
        .expect("Failed to trust test certificate");

    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![ALPN.to_vec()];

    let name = ServerName::try_from("localhost").expect("Invalid server name");
    TlsContext::client(Arc::new(config), name)
}

fn memory_pair() -> (TlsStream<MemoryStream>, TlsStream<MemoryStream>) {
    let (client_raw, server_raw) = duplex(8);

    let client = TlsStream::client(client_context(), client_raw).unwrap();
    let server = TlsStream::server(server_context(), server_raw).unwrap();

    (client, server)
}

#[courier::test]
async fn test_handshake_and_echo_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("127.0.0.1:{}", listener.port().unwrap());

    let server = task::spawn(async move {
        let (raw, _) = listener.accept().await.unwrap();
        let mut tls = TlsStream::server(server_context(), raw).unwrap();

        let request = tls.receive().await.unwrap();
        tls.send(&request).await.unwrap();

        assert_eq!(tls.state(), HandshakeState::Established);
        tls.shutdown().await.unwrap();
    });

    let raw = TcpStream::connect(&address).await.unwrap();
    let mut tls = TlsStream::client(client_context(), raw).unwrap();
    assert_eq!(tls.state(), HandshakeState::NotStarted);

    tls.send(b"hello over tls").await.unwrap();
    assert_eq!(tls.state(), HandshakeState::Established);
    assert_eq!(tls.alpn_protocol(), Some(ALPN));

    assert_eq!(tls.receive().await.unwrap(), b"hello over tls");

    server.await;

    assert!(matches!(tls.receive().await, Err(TlsError::Closed)));
    assert_eq!(tls.state(), HandshakeState::Established);
}

#[courier::test]
async fn test_handshake_over_memory_duplex() {
    let (mut client, mut server) = memory_pair();

    let peer = task::spawn(async move {
        server.handshake().await.unwrap();
        server
    });

    client.handshake().await.unwrap();
    let mut server = peer.await;

    assert_eq!(client.state(), HandshakeState::Established);
    assert_eq!(server.state(), HandshakeState::Established);

    client.send(b"first").await.unwrap();
    client.send(b"second").await.unwrap();

    let mut received = Vec::new();
    while received.len() < b"firstsecond".len() {
        let chunk = server.receive().await.unwrap();
        assert!(!chunk.is_empty());
        received.extend(chunk);
    }
    assert_eq!(received, b"firstsecond");
}

#[courier::test]
async fn test_large_payload_is_split_into_records() {
    let (mut client, mut server) = memory_pair();
    let payload: Vec<u8> = (0..100_000u32).map(|i| i as u8).collect();

    let expected = payload.len();
    let reader = task::spawn(async move {
        let mut received = Vec::new();
        while received.len() < expected {
            received.extend(server.receive().await.unwrap());
        }
        received
    });

    client.send(&payload).await.unwrap();
    assert_eq!(reader.await, payload);
}

#[courier::test]
async fn test_context_role_mismatch_is_rejected() {
    let (client_raw, server_raw) = duplex(1);

    match TlsStream::server(client_context(), server_raw) {
        Err(TlsError::UnsupportedContext { expected, found }) => {
            assert_eq!(expected, Role::Server);
            assert_eq!(found, Role::Client);
        }
        _ => panic!("server stream accepted a client context"),
    }

    assert!(matches!(
        TlsStream::client(server_context(), client_raw),
        Err(TlsError::UnsupportedContext { .. })
    ));
}

#[courier::test]
async fn test_new_picks_role_from_context() {
    let (client_raw, server_raw) = duplex(1);

    let client = TlsStream::new(client_context(), client_raw).unwrap();
    let server = TlsStream::new(server_context(), server_raw).unwrap();

    assert_eq!(client.context().role(), Role::Client);
    assert_eq!(server.context().role(), Role::Server);
}

#[courier::test]
async fn test_raw_failure_fails_the_session() {
    let (client_raw, mut server_raw) = duplex(1);
    server_raw.close();

    let mut client = TlsStream::client(client_context(), client_raw).unwrap();

    assert!(matches!(client.handshake().await, Err(TlsError::Transport(_))));
    assert_eq!(client.state(), HandshakeState::Failed);

    assert!(matches!(client.send(b"data").await, Err(TlsError::Failed)));
    assert!(matches!(client.receive().await, Err(TlsError::Failed)));
}

#[courier::test]
async fn test_garbage_from_peer_is_an_engine_error() {
    let (mut client_raw, server_raw) = duplex(4);
    let mut server = TlsStream::server(server_context(), server_raw).unwrap();

    client_raw
        .send(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    assert!(matches!(server.receive().await, Err(TlsError::Engine(_))));
    assert_eq!(server.state(), HandshakeState::Failed);
}

#[courier::test]
async fn test_untrusted_server_fails_handshake() {
    let (client_raw, server_raw) = duplex(8);

    let config = ClientConfig::builder()
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth();
    let name = ServerName::try_from("localhost").unwrap();
    let context = TlsContext::client(Arc::new(config), name);

    let mut client = TlsStream::client(context, client_raw).unwrap();
    let mut server = TlsStream::server(server_context(), server_raw).unwrap();

    let peer = task::spawn(async move { server.handshake().await.is_err() });

    let err = client.handshake().await.unwrap_err();
    assert!(matches!(
        err,
        TlsError::Engine(rustls::Error::InvalidCertificate(_))
    ));
    assert_eq!(client.state(), HandshakeState::Failed);

    // The client's alert ends the server side too.
    assert!(peer.await);
}

#[courier::test]
async fn test_close_is_idempotent_and_final() {
    let (mut client, _server) = memory_pair();

    client.close();
    client.close();

    assert!(matches!(client.send(b"late").await, Err(TlsError::Closed)));
    assert!(client.shutdown().await.is_ok());
}

#[courier::test]
async fn test_pipe_starts_a_fresh_session() {
    let (client, _server) = memory_pair();

    let piped = client.pipe().unwrap();
    assert_eq!(piped.state(), HandshakeState::NotStarted);
    assert_eq!(piped.context().role(), Role::Client);
}
