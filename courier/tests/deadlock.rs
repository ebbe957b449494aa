use courier::sync::Channel;
use courier::{RuntimeBuilder, task};
use std::os::unix::process::ExitStatusExt;
use std::process::Command;

const CHILD_ENV: &str = "COURIER_DEADLOCK_CHILD";

/// Runs the named test of this binary in a child process and returns
/// its exit status.
fn run_child(test: &str) -> std::process::ExitStatus {
    let exe = std::env::current_exe().expect("Failed to locate test binary");

    Command::new(exe)
        .args(["--exact", test, "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .output()
        .expect("Failed to run child process")
        .status
}

fn in_child() -> bool {
    std::env::var_os(CHILD_ENV).is_some()
}

#[test]
fn test_single_blocked_receive_aborts() {
    if in_child() {
        let rt = RuntimeBuilder::new().build().unwrap();
        let channel = Channel::<u8>::new();

        rt.block_on(async move {
            channel.receive().await;
        });

        unreachable!("block_on returned from a deadlock");
    }

    let status = run_child("test_single_blocked_receive_aborts");
    assert_eq!(status.signal(), Some(libc::SIGABRT));
}

#[test]
fn test_tasks_waiting_on_each_other_abort() {
    if in_child() {
        let rt = RuntimeBuilder::new().build().unwrap();
        let ping = Channel::<()>::new();
        let pong = Channel::<()>::new();

        rt.block_on(async move {
            let (their_ping, their_pong) = (ping.clone(), pong.clone());
            let other = task::spawn(async move {
                their_ping.receive().await;
                their_pong.send(()).await.unwrap();
            });

            pong.receive().await;
            ping.send(()).await.unwrap();
            other.await;
        });

        unreachable!("block_on returned from a deadlock");
    }

    let status = run_child("test_tasks_waiting_on_each_other_abort");
    assert_eq!(status.signal(), Some(libc::SIGABRT));
}

#[test]
fn test_blocked_receive_with_pending_timer_is_not_a_deadlock() {
    let rt = RuntimeBuilder::new().build().unwrap();
    let channel = Channel::<u8>::new();
    let sender = channel.sender();

    let value = rt.block_on(async move {
        task::spawn(async move {
            courier::time::sleep(std::time::Duration::from_millis(20)).await;
            sender.send(9).await.unwrap();
        });

        channel.receive().await
    });

    assert_eq!(value, Some(9));
}

#[test]
fn test_joining_many_tasks_beside_a_blocked_receiver_is_not_a_deadlock() {
    if in_child() {
        let rt = RuntimeBuilder::new().worker_threads(4).build().unwrap();
        let channel = Channel::<u8>::new();
        let sender = channel.sender();

        let total = rt.block_on(async move {
            let consumer = task::spawn(async move { channel.receive().await });

            let started = std::time::Instant::now();
            let mut joined = 0u64;
            while started.elapsed() < std::time::Duration::from_secs(1) {
                joined += u64::from(task::spawn(async { 1u8 }).await);
            }

            sender.send(5).await.unwrap();
            assert_eq!(consumer.await, Some(5));
            joined
        });

        assert!(total > 0);
        return;
    }

    let status = run_child("test_joining_many_tasks_beside_a_blocked_receiver_is_not_a_deadlock");
    assert!(status.success(), "child exited with {status:?}");
}
