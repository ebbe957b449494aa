//! Task lifecycle states.
//!
//! ```text
//!   spawn ──► QUEUED ──► RUNNING ──► COMPLETED
//!               ▲           │
//!               │  wake     ├── Pending ──► IDLE ──┐
//!               │           │                      │ wake
//!               └───────────┴── woken ──► NOTIFIED │
//!               ▲                                  │
//!               └──────────────────────────────────┘
//! ```

/// Suspended: not queued and not running. Counted as idle in the census.
pub(crate) const IDLE: usize = 0;

/// Sitting in the run queue.
pub(crate) const QUEUED: usize = 1;

/// Being polled. At most one worker observes this state at a time.
pub(crate) const RUNNING: usize = 2;

/// The future returned `Poll::Ready` and has been dropped.
pub(crate) const COMPLETED: usize = 3;

/// Woken while running; goes back to the queue once the poll returns.
pub(crate) const NOTIFIED: usize = 4;
