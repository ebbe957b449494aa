use courier::{RuntimeBuilder, task, yield_now};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_block_on_returns_value() {
    let rt = RuntimeBuilder::new().build().unwrap();
    assert_eq!(rt.block_on(async { 42 }), 42);
}

#[courier::test]
async fn test_spawned_tasks_run_in_spawn_order() {
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let order = order.clone();
            task::spawn(async move { order.lock().unwrap().push(i) })
        })
        .collect();

    for handle in handles {
        handle.await;
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[courier::test]
async fn test_spawn_does_not_run_task_eagerly() {
    let ran = Arc::new(AtomicUsize::new(0));

    let flag = ran.clone();
    let handle = task::spawn(async move {
        flag.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(!handle.is_finished());

    handle.await;
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[courier::test]
async fn test_yield_now_interleaves_tasks() {
    let trace = Arc::new(Mutex::new(Vec::new()));

    let spawn_worker = |name: &'static str| {
        let trace = trace.clone();
        task::spawn(async move {
            for step in 0..3 {
                trace.lock().unwrap().push((name, step));
                yield_now().await;
            }
        })
    };

    let a = spawn_worker("a");
    let b = spawn_worker("b");
    a.await;
    b.await;

    assert_eq!(
        *trace.lock().unwrap(),
        vec![("a", 0), ("b", 0), ("a", 1), ("b", 1), ("a", 2), ("b", 2)]
    );
}

#[courier::test]
async fn test_join_handle_yields_output() {
    let handle = task::spawn(async { String::from("done") });
    assert_eq!(handle.await, "done");
}

#[courier::test]
async fn test_nested_spawn() {
    let outer = task::spawn(async {
        let inner = task::spawn(async { 2 });
        inner.await * 21
    });

    assert_eq!(outer.await, 42);
}

#[test]
fn test_runtime_spawn_from_outside() {
    let rt = RuntimeBuilder::new().build().unwrap();

    let handle = rt.spawn(async { 7 });
    assert_eq!(rt.block_on(handle), 7);
}

#[test]
fn test_multiple_worker_threads_complete_every_task() {
    let rt = RuntimeBuilder::new().worker_threads(4).build().unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let total = counter.clone();
    rt.block_on(async move {
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let counter = total.clone();
                task::spawn(async move {
                    yield_now().await;
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    });

    assert_eq!(counter.load(Ordering::SeqCst), 100);
}

#[courier::test(worker_threads = 2)]
async fn test_macro_accepts_worker_threads() {
    let handle = task::spawn(async { 1 + 1 });
    assert_eq!(handle.await, 2);
}

#[test]
#[should_panic(expected = "boom")]
fn test_block_on_resumes_panic() {
    let rt = RuntimeBuilder::new().build().unwrap();
    rt.block_on(async {
        panic!("boom");
    });
}

#[test]
fn test_runtime_is_reusable_after_block_on() {
    let rt = RuntimeBuilder::new().build().unwrap();

    assert_eq!(rt.block_on(async { 1 }), 1);
    assert_eq!(rt.block_on(async { 2 }), 2);
}
