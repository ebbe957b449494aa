use super::Runtime;
use crate::time::{Clock, SystemClock};

use std::io;
use std::sync::Arc;

/// Builder for configuring and creating a [`Runtime`].
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(2)
///     .clock(Arc::new(ManualClock::new()))
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    /// Number of worker threads in the executor.
    worker_threads: usize,

    /// Time source for timers and deadlines.
    clock: Arc<dyn Clock>,
}

impl RuntimeBuilder {
    /// Creates a builder with one worker thread and the system clock.
    ///
    /// A single worker runs tasks strictly in the order they became
    /// runnable, which keeps scheduling deterministic.
    pub fn new() -> Self {
        Self {
            worker_threads: 1,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the number of worker threads used by the runtime.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Replaces the clock timers and deadlines are measured against.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts the reactor and the worker threads.
    pub fn build(self) -> io::Result<Runtime> {
        Runtime::new(self.worker_threads, self.clock)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
