//! The scheduler.
//!
//! A [`Runtime`] owns a reactor thread and a pool of workers draining a
//! single FIFO run queue. Tasks are spawned with [`task::spawn`], give
//! way with [`yield_now`], and the synchronous world enters through
//! [`Runtime::block_on`].

pub(crate) mod census;
mod core;
mod executor;
pub(crate) mod queue;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod yield_now;

pub mod task;

pub use core::Runtime;
