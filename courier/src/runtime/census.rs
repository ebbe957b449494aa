use std::process;

/// Counters describing what every task of a runtime is waiting on.
///
/// All counters live behind the run queue's census lock and are updated
/// at the exact points where a task changes state, so a snapshot taken
/// under the lock is consistent:
///
/// - `live`: spawned tasks that have not completed,
/// - `idle`: live tasks that are suspended (not queued, not running),
/// - `timers`: sleep timers currently armed in the reactor,
/// - `io`: I/O registrations currently armed in the reactor,
/// - `channel_waiters`: suspended channel sends and receives,
/// - `roots`: `block_on` root futures that have not finished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Census {
    pub(crate) live: usize,
    pub(crate) idle: usize,
    pub(crate) timers: usize,
    pub(crate) io: usize,
    pub(crate) channel_waiters: usize,
    pub(crate) roots: usize,
}

impl Census {
    /// Returns `true` if no task can ever make progress again.
    ///
    /// That is the case when a `block_on` caller is waiting, every live
    /// task is suspended, nothing outside the tasks (timers, sockets) is
    /// left to wake one of them, and at least one is parked on a channel.
    pub(crate) fn is_deadlocked(&self) -> bool {
        self.roots > 0
            && self.live > 0
            && self.idle == self.live
            && self.timers == 0
            && self.io == 0
            && self.channel_waiters > 0
    }
}

/// Reports a global deadlock and aborts the process.
pub(crate) fn abort_on_deadlock(census: Census) -> ! {
    tracing::error!(?census, "deadlock: every task is blocked and nothing can wake them");
    eprintln!(
        "courier: deadlock detected: {} task(s) blocked, {} on channel operations",
        census.live, census.channel_waiters
    );

    process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked_root() -> Census {
        Census {
            live: 2,
            idle: 2,
            timers: 0,
            io: 0,
            channel_waiters: 1,
            roots: 1,
        }
    }

    #[test]
    fn all_idle_on_channels_is_a_deadlock() {
        assert!(blocked_root().is_deadlocked());
    }

    #[test]
    fn pending_timer_or_io_can_still_wake_someone() {
        let timers = Census {
            timers: 1,
            ..blocked_root()
        };
        let io = Census {
            io: 1,
            ..blocked_root()
        };

        assert!(!timers.is_deadlocked());
        assert!(!io.is_deadlocked());
    }

    #[test]
    fn runnable_task_or_finished_root_is_not_a_deadlock() {
        let runnable = Census {
            idle: 1,
            ..blocked_root()
        };
        let detached = Census {
            roots: 0,
            ..blocked_root()
        };

        assert!(!runnable.is_deadlocked());
        assert!(!detached.is_deadlocked());
    }
}
