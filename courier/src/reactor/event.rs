/// Readiness of one registered descriptor after a poll.
///
/// Errors and hang-ups set both flags, so every waiter retries its
/// syscall and observes the failure.
pub(crate) struct Event {
    /// The descriptor's registration token.
    pub(crate) token: usize,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}
