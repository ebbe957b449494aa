use crate::runtime::census::Census;
use crate::runtime::task::Runnable;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Shared handle to the run queue.
pub(crate) type QueueHandle = Arc<RunQueue>;

/// Upper bound on how long an idle worker sleeps before re-checking
/// the queue and the census.
const PARK_TIMEOUT: Duration = Duration::from_millis(10);

/// The single, global run queue of a runtime.
///
/// Tasks are executed strictly in the order they became runnable:
/// spawning, waking and re-queuing all push to the back, workers pop
/// from the front. Idle workers park on a condition variable.
///
/// The queue also owns the [`Census`] used for deadlock detection.
pub(crate) struct RunQueue {
    /// Runnable tasks in FIFO order.
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,

    /// Condition variable used to wake parked workers.
    condvar: Condvar,

    /// Indicates whether the executor is shutting down.
    shutdown: AtomicBool,

    /// Task and wait-set counters.
    census: Mutex<Census>,
}

impl RunQueue {
    /// Creates a new empty run queue.
    pub(crate) fn new() -> Self {
        RunQueue {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
            census: Mutex::new(Census::default()),
        }
    }

    /// Signals shutdown and wakes all parked workers.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Pushes a runnable task to the back of the queue and wakes one
    /// parked worker. Tasks pushed after shutdown are dropped.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        if self.is_shutdown() {
            return;
        }

        self.queue.lock().unwrap().push_back(task);
        self.condvar.notify_one();
    }

    /// Takes the oldest runnable task.
    pub(crate) fn pop(&self) -> Option<Arc<dyn Runnable>> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Parks the current worker until work is pushed, shutdown is
    /// signalled, or [`PARK_TIMEOUT`] elapses.
    pub(crate) fn park(&self) {
        let queue = self.queue.lock().unwrap();

        if !queue.is_empty() || self.is_shutdown() {
            return;
        }

        let _ = self.condvar.wait_timeout(queue, PARK_TIMEOUT).unwrap();
    }

    /// Drops every queued task. Used once all workers have stopped.
    pub(crate) fn clear(&self) {
        let tasks: Vec<_> = self.queue.lock().unwrap().drain(..).collect();
        drop(tasks);
    }

    /// Locks the census.
    ///
    /// Lock order is channel state, then census, then queue; the census
    /// lock is never held while a channel lock is acquired.
    pub(crate) fn census(&self) -> MutexGuard<'_, Census> {
        self.census.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Probe {
        id: usize,
        ran: Arc<Mutex<Vec<usize>>>,
    }

    impl Runnable for Probe {
        fn run(self: Arc<Self>) {
            self.ran.lock().unwrap().push(self.id);
        }
    }

    #[test]
    fn pops_in_push_order() {
        let queue = RunQueue::new();
        let ran = Arc::new(Mutex::new(Vec::new()));

        for id in 0..4 {
            queue.push(Arc::new(Probe {
                id,
                ran: ran.clone(),
            }));
        }

        while let Some(task) = queue.pop() {
            task.run();
        }

        assert_eq!(*ran.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn push_after_shutdown_is_dropped() {
        let queue = RunQueue::new();
        let drops = Arc::new(AtomicUsize::new(0));

        struct Counted(Arc<AtomicUsize>);
        impl Runnable for Counted {
            fn run(self: Arc<Self>) {}
        }
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        queue.shutdown();
        queue.push(Arc::new(Counted(drops.clone())));

        assert!(queue.pop().is_none());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
