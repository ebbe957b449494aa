use crate::runtime::census::abort_on_deadlock;
use crate::runtime::queue::QueueHandle;

/// A worker thread of the executor.
///
/// Every worker drains the same global queue, oldest task first. When
/// the queue runs dry the worker checks the census for a global stall
/// before parking.
pub(crate) struct Worker {
    id: usize,
    queue: QueueHandle,
}

impl Worker {
    pub(crate) fn new(id: usize, queue: QueueHandle) -> Self {
        Self { id, queue }
    }

    /// Runs tasks until the queue is shut down.
    pub(crate) fn run(&self) {
        tracing::trace!(worker = self.id, "worker started");

        while !self.queue.is_shutdown() {
            if let Some(task) = self.queue.pop() {
                task.run();
                continue;
            }

            {
                let census = self.queue.census();
                if census.is_deadlocked() {
                    abort_on_deadlock(*census);
                }
            }

            self.queue.park();
        }

        tracing::trace!(worker = self.id, "worker stopped");
    }
}
