use courier::net::{SocketError, TcpListener, TcpStream};
use courier::stream::Stream;
use courier::sync::Channel;
use courier::task;
use courier::time::Deadline;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd};
use std::time::{Duration, Instant};

fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let port = listener.port().expect("Failed to get local port");

    (listener, format!("127.0.0.1:{port}"))
}

#[courier::test]
async fn test_client_server_exchange() {
    let (listener, address) = listen();

    let client = task::spawn(async move {
        let socket = TcpStream::connect(&address).await.unwrap();

        // Detach and re-attach the descriptor.
        let fd = socket.into_raw_fd();
        assert_ne!(fd, -1);
        let mut socket = unsafe { TcpStream::from_raw_fd(fd) };

        let data = socket.receive(3, Deadline::Never).await.unwrap();
        assert_eq!(data, b"ABC");

        socket.send(b"123\n45\n6789", Deadline::Never).await.unwrap();
        socket.flush(Deadline::Never).await.unwrap();
        socket.close();
    });

    let (mut socket, _) = listener.accept().await.unwrap();

    let deadline = Deadline::after(Duration::from_millis(30));
    let err = socket.receive(16, deadline).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.partial_data().is_empty());

    let late = Instant::now().saturating_duration_since(deadline.instant().unwrap());
    assert!(late < Duration::from_millis(300), "timeout resumed {late:?} late");

    socket.send(b"ABC", Deadline::Never).await.unwrap();
    socket.flush(Deadline::Never).await.unwrap();

    let first = socket.receive_until(b"\n", 1024, Deadline::Never).await.unwrap();
    assert_eq!(first, b"123\n");

    let second = socket.receive_until(b"\n", 1024, Deadline::Never).await.unwrap();
    assert_eq!(second, b"45\n");

    match socket.receive_until(b"\n", 3, Deadline::Never).await {
        Err(SocketError::NoBufferSpace { data }) => assert_eq!(data, b"678"),
        other => panic!("expected NoBufferSpace, got {other:?}"),
    }

    client.await;

    // The peer closed after its last write; what is left comes with the reset.
    match socket.receive(8, Deadline::Never).await {
        Err(SocketError::ConnectionReset { data }) => assert_eq!(data, b"9"),
        other => panic!("expected ConnectionReset, got {other:?}"),
    }
}

#[courier::test]
async fn test_fixed_size_receive_takes_exactly_size() {
    let (listener, address) = listen();

    let client = task::spawn(async move {
        let mut socket = TcpStream::connect(&address).await.unwrap();
        socket.send(b"6789", Deadline::Never).await.unwrap();
        socket.flush(Deadline::Never).await.unwrap();
        socket
    });

    let (mut socket, _) = listener.accept().await.unwrap();

    assert_eq!(socket.receive(3, Deadline::Never).await.unwrap(), b"678");
    assert_eq!(socket.receive(1, Deadline::Never).await.unwrap(), b"9");

    drop(client.await);
}

#[courier::test]
async fn test_timeout_returns_partial_data_and_stream_stays_usable() {
    let (listener, address) = listen();
    let go_on = Channel::<()>::with_capacity(1);
    let signal = go_on.receiver();

    let client = task::spawn(async move {
        let mut socket = TcpStream::connect(&address).await.unwrap();
        socket.send(b"12", Deadline::Never).await.unwrap();
        socket.flush(Deadline::Never).await.unwrap();

        signal.receive().await;

        socket.send(b"345", Deadline::Never).await.unwrap();
        socket.flush(Deadline::Never).await.unwrap();
        socket
    });

    let (mut socket, _) = listener.accept().await.unwrap();

    let start = Instant::now();
    let err = socket
        .receive(5, Deadline::after(Duration::from_millis(200)))
        .await
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_millis(200));
    match err {
        SocketError::Timeout { data } => assert_eq!(data, b"12"),
        other => panic!("expected Timeout, got {other:?}"),
    }

    go_on.send(()).await.unwrap();

    let rest = socket.receive(3, Deadline::after(Duration::from_secs(5))).await.unwrap();
    assert_eq!(rest, b"345");

    drop(client.await);
}

#[courier::test]
async fn test_large_send_is_written_through() {
    let (listener, address) = listen();
    let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();

    let expected = payload.clone();
    let reader = task::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.receive(expected.len(), Deadline::Never).await.unwrap() == expected
    });

    let mut socket = TcpStream::connect(&address).await.unwrap();
    socket.send(&payload, Deadline::Never).await.unwrap();

    assert!(reader.await);
}

#[courier::test]
async fn test_receive_some_returns_available_bytes() {
    let (listener, address) = listen();

    let client = task::spawn(async move {
        let mut socket = TcpStream::connect(&address).await.unwrap();
        Stream::send(&mut socket, b"hello").await.unwrap();
        socket
    });

    let (mut socket, peer) = listener.accept().await.unwrap();
    let client_socket = client.await;

    assert_eq!(peer, client_socket.local_addr().unwrap());

    let mut received = Vec::new();
    while received.len() < 5 {
        let chunk = socket.receive_some(2, Deadline::Never).await.unwrap();
        assert!(!chunk.is_empty() && chunk.len() <= 2);
        received.extend(chunk);
    }

    assert_eq!(received, b"hello");
}

#[courier::test]
async fn test_split_halves_share_the_socket() {
    let (listener, address) = listen();

    let echo = task::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let line = socket.receive_until(b"\n", 64, Deadline::Never).await.unwrap();
        Stream::send(&mut socket, &line).await.unwrap();
    });

    let mut socket = TcpStream::connect(&address).await.unwrap();
    let (mut reader, mut writer) = socket.split();

    writer.send(b"ping\n", Deadline::Never).await.unwrap();
    writer.flush(Deadline::Never).await.unwrap();

    let reply = reader.receive_until(b"\n", 64, Deadline::Never).await.unwrap();
    assert_eq!(reply, b"ping\n");

    echo.await;
}

#[courier::test]
async fn test_pipe_shares_the_connection() {
    let (listener, address) = listen();

    let server = task::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.receive(6, Deadline::Never).await.unwrap()
    });

    let mut socket = TcpStream::connect(&address).await.unwrap();
    let mut piped = socket.pipe().unwrap();
    assert_ne!(piped.as_raw_fd(), socket.as_raw_fd());

    Stream::send(&mut socket, b"abc").await.unwrap();
    Stream::send(&mut piped, b"def").await.unwrap();

    assert_eq!(server.await, b"abcdef");
}

#[courier::test]
async fn test_closed_stream_rejects_operations() {
    let (listener, address) = listen();

    let accept = task::spawn(async move { listener.accept().await.map(|(socket, _)| socket) });

    let mut socket = TcpStream::connect(&address).await.unwrap();
    socket.close();
    socket.close();

    assert!(socket.is_closed());
    assert_eq!(socket.as_raw_fd(), -1);
    assert!(matches!(
        socket.receive(1, Deadline::Never).await,
        Err(SocketError::Closed)
    ));
    assert!(matches!(
        socket.send(b"x", Deadline::Never).await,
        Err(SocketError::Closed)
    ));

    let _ = accept.await;
}

#[courier::test]
async fn test_connect_to_closed_port_fails() {
    let address = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };

    let result = TcpStream::connect(&address).await;
    assert!(result.is_err());
}
