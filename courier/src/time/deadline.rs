use super::now;

use std::time::{Duration, Instant};

/// The point in time a blocking operation gives up at.
///
/// Deadlines are absolute, so a caller can share one across several
/// calls (a connect, then a request, then the response) and they all
/// stop at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Deadline {
    /// Wait for as long as it takes.
    #[default]
    Never,

    /// Give up once the runtime clock reaches this instant.
    At(Instant),
}

impl Deadline {
    /// A deadline `duration` from now, measured on the runtime clock.
    pub fn after(duration: Duration) -> Self {
        match now().checked_add(duration) {
            Some(instant) => Deadline::At(instant),
            None => Deadline::Never,
        }
    }

    /// Returns the instant of this deadline, or `None` if it never expires.
    pub fn instant(self) -> Option<Instant> {
        match self {
            Deadline::Never => None,
            Deadline::At(instant) => Some(instant),
        }
    }

    /// Returns `true` if `now` is at or past the deadline.
    pub fn has_passed(self, now: Instant) -> bool {
        self.instant().is_some_and(|at| now >= at)
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Self {
        Deadline::At(instant)
    }
}
