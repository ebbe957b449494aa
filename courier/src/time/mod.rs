//! Time: clocks, deadlines, sleeping and timeouts.
//!
//! Everything here reads the time from the runtime's [`Clock`], so a
//! runtime built with a [`ManualClock`] can be driven through hours of
//! deadlines in a test without waiting.

mod clock;
mod deadline;
mod sleep;
mod timeout;

pub use clock::{AdvanceHook, Clock, ManualClock, SystemClock};
pub use deadline::Deadline;
pub use sleep::{Sleep, sleep, sleep_until};
pub use timeout::{Elapsed, Timeout, timeout, timeout_at};

use crate::runtime::context::current_reactor;

use std::time::Instant;

/// Returns the current time on the runtime clock.
///
/// Outside of a runtime this is the system monotonic clock.
pub fn now() -> Instant {
    match current_reactor() {
        Some(reactor) => reactor.clock().now(),
        None => Instant::now(),
    }
}
