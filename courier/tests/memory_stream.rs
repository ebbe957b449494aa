use courier::stream::{Stream, StreamClosed, duplex};
use courier::task;

#[courier::test]
async fn test_duplex_carries_chunks_both_ways() {
    let (mut left, mut right) = duplex(4);

    left.send(b"ping").await.unwrap();
    assert_eq!(right.receive().await.unwrap(), b"ping");

    right.send(b"pong").await.unwrap();
    assert_eq!(left.receive().await.unwrap(), b"pong");
}

#[courier::test]
async fn test_chunks_keep_send_order() {
    let (mut left, mut right) = duplex(1);

    let writer = task::spawn(async move {
        for chunk in [&b"one"[..], b"two", b"three"] {
            left.send(chunk).await.unwrap();
        }
        left
    });

    assert_eq!(right.receive().await.unwrap(), b"one");
    assert_eq!(right.receive().await.unwrap(), b"two");
    assert_eq!(right.receive().await.unwrap(), b"three");

    drop(writer.await);
}

#[courier::test]
async fn test_empty_send_is_not_delivered() {
    let (mut left, mut right) = duplex(4);

    left.send(b"").await.unwrap();
    left.send(b"x").await.unwrap();

    assert_eq!(right.receive().await.unwrap(), b"x");
}

#[courier::test]
async fn test_close_drains_then_fails() {
    let (mut left, mut right) = duplex(4);

    left.send(b"last").await.unwrap();
    left.close();
    left.close();

    assert_eq!(right.receive().await.unwrap(), b"last");
    assert_eq!(right.receive().await, Err(StreamClosed));
    assert_eq!(right.send(b"late").await, Err(StreamClosed));
    assert_eq!(left.receive().await, Err(StreamClosed));
}

#[courier::test]
async fn test_pipe_shares_both_directions() {
    let (mut left, mut right) = duplex(4);
    let mut piped = left.pipe().unwrap();

    piped.send(b"via pipe").await.unwrap();
    assert_eq!(right.receive().await.unwrap(), b"via pipe");

    right.send(b"back").await.unwrap();
    assert_eq!(left.receive().await.unwrap(), b"back");
}
