use courier::sync::{Channel, CloseError, SendError, TryReceiveError, TrySendError};
use courier::task;
use courier::yield_now;
use std::sync::{Arc, Mutex};

#[courier::test]
async fn test_buffered_channel_holds_up_to_capacity() {
    let channel = Channel::with_capacity(2);

    channel.send(1).await.unwrap();
    channel.send(2).await.unwrap();

    assert_eq!(channel.len(), 2);
    assert!(matches!(channel.try_send(3), Err(TrySendError::Full(3))));

    assert_eq!(channel.receive().await, Some(1));
    assert_eq!(channel.receive().await, Some(2));
    assert!(channel.is_empty());
}

#[courier::test]
async fn test_full_buffer_blocks_sender_until_receive() {
    let channel = Channel::with_capacity(1);
    channel.send("a").await.unwrap();

    let sender = channel.sender();
    let handle = task::spawn(async move {
        sender.send("b").await.unwrap();
    });

    yield_now().await;
    assert!(!handle.is_finished());

    assert_eq!(channel.receive().await, Some("a"));
    handle.await;

    assert_eq!(channel.receive().await, Some("b"));
}

#[courier::test]
async fn test_rendezvous_delivers_senders_in_arrival_order() {
    let channel = Channel::new();

    let first = channel.sender();
    let second = channel.sender();

    let a = task::spawn(async move { first.send(1).await.unwrap() });
    let b = task::spawn(async move { second.send(2).await.unwrap() });

    // Both senders park before anyone receives.
    yield_now().await;
    yield_now().await;

    assert_eq!(channel.receive().await, Some(1));
    assert_eq!(channel.receive().await, Some(2));

    a.await;
    b.await;
}

#[courier::test]
async fn test_rendezvous_send_waits_for_receiver() {
    let channel = Channel::new();
    let receiver = channel.receiver();

    let log = Arc::new(Mutex::new(Vec::new()));

    let consumer_log = log.clone();
    let consumer = task::spawn(async move {
        let value = receiver.receive().await;
        consumer_log.lock().unwrap().push("received");
        value
    });

    channel.send(7).await.unwrap();
    log.lock().unwrap().push("sent");

    assert_eq!(consumer.await, Some(7));
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[courier::test]
async fn test_close_drains_buffer_then_reports_end() {
    let channel = Channel::with_capacity(4);
    channel.send(10).await.unwrap();
    channel.send(20).await.unwrap();

    channel.close().unwrap();

    assert!(channel.is_closed());
    assert_eq!(channel.receive().await, Some(10));
    assert_eq!(channel.receive().await, Some(20));
    assert_eq!(channel.receive().await, None);
    assert_eq!(channel.try_receive(), Err(TryReceiveError::Closed));
}

#[courier::test]
async fn test_send_after_close_returns_value() {
    let channel = Channel::with_capacity(1);
    channel.close().unwrap();

    let err = channel.send(String::from("late")).await.unwrap_err();
    assert_eq!(err, SendError(String::from("late")));
    assert_eq!(err.into_inner(), "late");

    assert!(matches!(channel.try_send(String::new()), Err(TrySendError::Closed(_))));
}

#[courier::test]
async fn test_double_close_fails() {
    let channel = Channel::<u8>::new();

    assert_eq!(channel.close(), Ok(()));
    assert_eq!(channel.close(), Err(CloseError));
}

#[courier::test]
async fn test_close_wakes_blocked_receiver() {
    let channel = Channel::<u32>::new();
    let receiver = channel.receiver();

    let handle = task::spawn(async move { receiver.receive().await });
    yield_now().await;

    channel.close().unwrap();
    assert_eq!(handle.await, None);
}

#[courier::test]
async fn test_close_rejects_blocked_sender() {
    let channel = Channel::new();
    let sender = channel.sender();

    let handle = task::spawn(async move { sender.send(5).await });
    yield_now().await;

    channel.close().unwrap();
    assert_eq!(handle.await, Err(SendError(5)));
}

#[courier::test]
async fn test_iter_ends_after_close() {
    let channel = Channel::with_capacity(8);
    let sender = channel.sender();

    task::spawn(async move {
        for i in 0..5 {
            sender.send(i).await.unwrap();
        }
        sender.close().unwrap();
    });

    let mut seen = Vec::new();
    let mut iter = channel.iter();
    while let Some(value) = iter.next().await {
        seen.push(value);
    }

    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
}

#[courier::test]
async fn test_try_receive_on_empty_open_channel() {
    let channel = Channel::<()>::with_capacity(1);
    assert_eq!(channel.try_receive(), Err(TryReceiveError::Empty));
}

#[courier::test]
async fn test_views_see_the_same_state() {
    let channel = Channel::with_capacity(3);
    let sender = channel.sender();
    let receiver = channel.receiver();

    sender.send('x').await.unwrap();
    assert_eq!(channel.len(), 1);
    assert_eq!(receiver.try_receive(), Ok('x'));

    receiver.close().unwrap();
    assert!(sender.is_closed());
    assert!(channel.is_closed());
}
