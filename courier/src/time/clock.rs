use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Callback invoked when a clock jumps forward.
pub type AdvanceHook = Box<dyn Fn() + Send + Sync>;

/// Source of "now" for timers and deadlines.
///
/// Every runtime owns one clock, installed through
/// [`RuntimeBuilder::clock`](crate::RuntimeBuilder::clock). Timers, sleeps
/// and socket deadlines all read the time from it, so a test can swap in a
/// [`ManualClock`] and drive deadlines without waiting on the wall clock.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Registers a callback to run whenever the clock moves forward
    /// outside of the normal passage of time.
    ///
    /// The reactor uses this to re-evaluate its timers. Clocks that only
    /// follow real time can ignore it.
    fn on_advance(&self, hook: AdvanceHook) {
        let _ = hook;
    }
}

/// The monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Starts at the instant it was created and advances through
/// [`advance`](Self::advance). Cloning yields a handle to the same clock.
///
/// # Examples
///
/// ```rust,ignore
/// let clock = ManualClock::new();
/// let runtime = RuntimeBuilder::new().clock(Arc::new(clock.clone())).build();
///
/// runtime.spawn(async { sleep(Duration::from_secs(3600)).await });
/// clock.advance(Duration::from_secs(3600)); // the sleeper wakes right away
/// ```
#[derive(Clone)]
pub struct ManualClock {
    inner: Arc<ManualInner>,
}

struct ManualInner {
    now: Mutex<Instant>,
    hooks: Mutex<Vec<AdvanceHook>>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ManualInner {
                now: Mutex::new(Instant::now()),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Moves the clock forward by `duration` and notifies listeners.
    pub fn advance(&self, duration: Duration) {
        {
            let mut now = self.inner.now.lock().unwrap();
            *now += duration;
        }

        for hook in self.inner.hooks.lock().unwrap().iter() {
            hook();
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &*self.inner.now.lock().unwrap())
            .finish_non_exhaustive()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.inner.now.lock().unwrap()
    }

    fn on_advance(&self, hook: AdvanceHook) {
        self.inner.hooks.lock().unwrap().push(hook);
    }
}
