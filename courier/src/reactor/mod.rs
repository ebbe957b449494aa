//! Reactor core and event handling.
//!
//! The reactor is responsible for:
//! - driving I/O readiness,
//! - managing timers against the runtime clock,
//! - waking tasks when external events occur,
//! - closing socket descriptors once nothing is registered on them.
//!
//! It runs independently from the executor and communicates with it
//! through commands and wakers.

mod core;
mod event;
mod io;
mod timer;

pub(crate) mod command;
pub(crate) mod future;
pub(crate) mod poller;

pub(crate) use core::{Reactor, ReactorHandle};
