//! Spawned tasks.
//!
//! A task wraps a `Send + 'static` future, is polled by the runtime's
//! workers and rescheduled through its waker. [`spawn`] is the entry
//! point; [`JoinHandle`] awaits the output.

mod core;
mod handle;
pub(crate) mod state;
mod waker;

pub(crate) use core::{Runnable, Task, spawn_on};
pub use core::spawn;
pub use handle::JoinHandle;
