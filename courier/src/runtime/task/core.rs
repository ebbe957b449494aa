use super::JoinHandle;
use super::state::{COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::runtime::context::current_queue;
use crate::runtime::queue::QueueHandle;
use crate::runtime::task::waker::make_waker;

use std::any::Any;
use std::cell::UnsafeCell;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// A runnable unit of work that can be executed by the scheduler.
///
/// The `Runnable` trait abstracts the specific return type of a task,
/// allowing the run queue to hold a heterogeneous collection of tasks
/// through `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    /// Executes the task. This is typically called by a worker thread.
    fn run(self: Arc<Self>);
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A spawned asynchronous task managed by the runtime.
///
/// A `Task` owns a future and coordinates its lifecycle: execution
/// state, rescheduling through its waker, result storage and the
/// census counters used for deadlock detection.
pub(crate) struct Task<T> {
    /// The underlying future, dropped as soon as it completes.
    ///
    /// Only accessed while the task is `RUNNING`, which a single worker
    /// can observe at a time.
    future: UnsafeCell<Option<BoxFuture<T>>>,

    /// Storage for the result produced by the future upon completion.
    pub(crate) result: UnsafeCell<Option<T>>,

    /// The current lifecycle state of the task (IDLE, RUNNING, etc.).
    pub(crate) state: AtomicUsize,

    /// Run queue used for rescheduling.
    queue: QueueHandle,

    /// Wakers of the `JoinHandle`s awaiting this task.
    pub(crate) waiters: Mutex<Vec<Waker>>,
}

unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    /// Creates a new task in the `QUEUED` state and counts it as live.
    ///
    /// The caller is responsible for pushing it onto the run queue.
    pub(crate) fn new<F>(future: F, queue: QueueHandle) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        queue.census().live += 1;

        Self {
            future: UnsafeCell::new(Some(Box::pin(future))),
            result: UnsafeCell::new(None),
            state: AtomicUsize::new(QUEUED),
            queue,
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Polls the task once.
    ///
    /// - `Poll::Pending`: transitions to `IDLE`, or re-queues the task
    ///   if it was woken while running.
    /// - `Poll::Ready`: stores the result and wakes the join handles.
    ///
    /// A panic escaping the future is fatal to the whole process.
    pub(crate) fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        // Transition to RUNNING. This ensures exclusive access to the UnsafeCell.
        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: The RUNNING state guarantees that no other thread is polling this future.
        let slot = unsafe { &mut *self.future.get() };
        let Some(future) = slot.as_mut() else {
            return;
        };

        let poll = match panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx))) {
            Ok(poll) => poll,
            Err(payload) => abort_on_panic(payload),
        };

        match poll {
            Poll::Pending => {
                let mut census = self.queue.census();

                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    census.idle += 1;
                } else {
                    drop(census);

                    // Woken while running: go straight back to the queue.
                    self.state.store(QUEUED, Ordering::Release);
                    self.queue.push(self.clone());
                }
            }
            Poll::Ready(val) => {
                *slot = None;

                unsafe {
                    *self.result.get() = Some(val);
                }
                self.state.store(COMPLETED, Ordering::Release);

                // Joiners must be runnable before this task leaves the
                // census, or a snapshot in between sees them all idle.
                let waiters = std::mem::take(&mut *self.waiters.lock().unwrap());
                for w in waiters {
                    w.wake();
                }

                self.queue.census().live -= 1;
            }
        }
    }

    /// Signals the task to be rescheduled.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and is pushed to the
    /// back of the run queue. If the task is `RUNNING`, it moves to
    /// `NOTIFIED` so it is re-queued right after its current poll.
    pub(crate) fn wake(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    let mut census = self.queue.census();

                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        census.idle -= 1;
                        drop(census);

                        self.queue.push(self.clone());
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Already queued, notified, or finished: nothing to do.
                _ => return,
            }
        }
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        Task::run(self)
    }
}

fn abort_on_panic(payload: Box<dyn Any + Send>) -> ! {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>");

    tracing::error!(panic = message, "task panicked; aborting");
    eprintln!("courier: task panicked: {message}");

    process::abort()
}

/// Creates a task on `queue`, enqueues it and returns its handle.
pub(crate) fn spawn_on<F, T>(queue: &QueueHandle, future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let task = Arc::new(Task::new(future, queue.clone()));
    queue.push(task.clone());

    JoinHandle { task }
}

/// Spawns a future as a task onto the current runtime.
///
/// The task is appended to the run queue and the call returns
/// immediately; the new task first runs once every task that was
/// already runnable has had its turn.
///
/// # Panics
/// Panics if called outside the context of a running runtime.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let queue = current_queue().expect("spawn must be called within the context of a runtime");

    spawn_on(&queue, future)
}
