use super::executor::core::Executor;
use super::task::JoinHandle;
use crate::reactor::command::Command;
use crate::reactor::{Reactor, ReactorHandle};
use crate::time::Clock;

use std::any::Any;
use std::future::Future;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, mpsc};
use std::task::{Context, Poll};
use std::thread::JoinHandle as ThreadHandle;

/// The runtime: a reactor thread plus a pool of worker threads.
///
/// Dropping the runtime stops the workers, then the reactor, and joins
/// every thread. Tasks that have not finished by then are dropped.
pub struct Runtime {
    executor: Executor,
    reactor: ReactorHandle,
    reactor_thread: Option<ThreadHandle<()>>,
}

impl Runtime {
    pub(crate) fn new(worker_threads: usize, clock: Arc<dyn Clock>) -> io::Result<Self> {
        let (reactor, reactor_thread) = Reactor::start(clock)?;

        let executor = match Executor::new(reactor.clone(), worker_threads) {
            Ok(executor) => executor,
            Err(err) => {
                let _ = reactor.send(Command::Shutdown);
                let _ = reactor_thread.join();
                return Err(err);
            }
        };

        tracing::debug!(worker_threads, "runtime started");

        Ok(Self {
            executor,
            reactor,
            reactor_thread: Some(reactor_thread),
        })
    }

    /// Spawns a future onto the runtime from outside of it.
    ///
    /// The task is appended to the run queue; it does not run on the
    /// calling thread.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let handle = runtime.spawn(async { 21 * 2 });
    /// assert_eq!(runtime.block_on(handle), 42);
    /// ```
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        self.executor.spawn(future)
    }

    /// Runs a future to completion, blocking the current thread.
    ///
    /// The future becomes a task like any other. While it is pending the
    /// runtime watches for deadlocks: if every task ends up blocked on a
    /// channel with no timer or socket left to wake one, the process is
    /// aborted with a diagnostic instead of hanging.
    ///
    /// # Panics
    ///
    /// A panic inside `future` is resumed on the calling thread.
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (transmitter, receiver) = mpsc::channel();
        let queue = self.executor.queue().clone();

        queue.census().roots += 1;

        let root_queue = queue.clone();
        let _ = self.spawn(async move {
            let result = CatchUnwind(Box::pin(future)).await;

            root_queue.census().roots -= 1;
            let _ = transmitter.send(result);
        });

        match receiver.recv() {
            Ok(Ok(value)) => value,
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => {
                queue.census().roots -= 1;
                panic!("runtime shut down before the block_on future completed")
            }
        }
    }

    /// Returns the clock this runtime measures time against.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.reactor.clock().clone()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.executor.shutdown();
        self.executor.join();

        let _ = self.reactor.send(Command::Shutdown);
        if let Some(thread) = self.reactor_thread.take() {
            let _ = thread.join();
        }

        tracing::debug!("runtime stopped");
    }
}

/// Resolves to `Err(payload)` instead of unwinding through the worker.
struct CatchUnwind<F>(Pin<Box<F>>);

impl<F: Future> Future for CatchUnwind<F> {
    type Output = Result<F::Output, Box<dyn Any + Send>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.0.as_mut();

        match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Ready(value)) => Poll::Ready(Ok(value)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}
