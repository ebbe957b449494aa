use crate::reactor::ReactorHandle;
use crate::runtime::context::enter_context;
use crate::runtime::executor::worker::Worker;
use crate::runtime::queue::{QueueHandle, RunQueue};
use crate::runtime::task::{JoinHandle, spawn_on};

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle as ThreadHandle};

/// Pool of worker threads sharing one FIFO run queue.
pub(crate) struct Executor {
    queue: QueueHandle,
    handles: Vec<ThreadHandle<()>>,
}

impl Executor {
    /// Starts `threads` workers, each running inside the runtime context.
    pub(crate) fn new(reactor: ReactorHandle, threads: usize) -> io::Result<Self> {
        let queue = Arc::new(RunQueue::new());
        let mut handles = Vec::with_capacity(threads);

        for id in 0..threads {
            let worker = Worker::new(id, queue.clone());
            let reactor = reactor.clone();
            let context_queue = queue.clone();

            let spawned = thread::Builder::new()
                .name(format!("courier-worker-{id}"))
                .spawn(move || enter_context(reactor, context_queue, || worker.run()));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    queue.shutdown();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(err);
                }
            }
        }

        Ok(Self { queue, handles })
    }

    pub(crate) fn queue(&self) -> &QueueHandle {
        &self.queue
    }

    /// Enqueues a new task. Tasks spawned after shutdown never run.
    pub(crate) fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        spawn_on(&self.queue, future)
    }

    /// Stops the workers after their current task.
    pub(crate) fn shutdown(&self) {
        self.queue.shutdown();
    }

    /// Waits for every worker to exit, then drops the tasks left behind.
    pub(crate) fn join(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }

        self.queue.clear();
    }
}
