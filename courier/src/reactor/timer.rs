use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{self, AtomicBool};
use std::task::Waker;
use std::time::Instant;

/// An entry in the reactor timer queue.
///
/// `TimerEntry` represents a scheduled wake-up at a specific
/// deadline, stored inside a binary heap ordered by deadline.
/// Entries with the same deadline fire in registration order.
///
/// The entry may be cancelled before it fires.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Registration sequence number, used as a FIFO tie-break.
    pub(crate) seq: u64,

    /// Waker to notify when the deadline is reached.
    pub(crate) waker: Waker,

    /// Cancellation flag shared with the associated sleep future.
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then by sequence.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<TimerEntry>`
    /// behaves as a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Smallest heap size that triggers a sweep of cancelled timers.
pub(crate) const COMPACT_MIN: usize = 64;

/// Drops every cancelled entry, wherever it sits in the heap, and
/// returns how many were removed.
///
/// Expired entries are popped from the top only, so cancelled deadlines
/// queued behind a long live timer would otherwise hold on to their
/// wakers indefinitely.
pub(crate) fn purge_cancelled(heap: &mut BinaryHeap<TimerEntry>) -> usize {
    let before = heap.len();
    heap.retain(|entry| !entry.cancelled.load(atomic::Ordering::Acquire));
    before - heap.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Waker;
    use std::time::Duration;

    fn entry(deadline: Instant, seq: u64) -> TimerEntry {
        TimerEntry {
            deadline,
            seq,
            waker: Waker::noop().clone(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn heap_pops_earliest_deadline_then_oldest_registration() {
        let base = Instant::now();
        let mut heap = BinaryHeap::new();

        heap.push(entry(base + Duration::from_millis(20), 0));
        heap.push(entry(base + Duration::from_millis(10), 2));
        heap.push(entry(base + Duration::from_millis(10), 1));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn purge_drops_cancelled_entries_behind_a_live_one() {
        let base = Instant::now();
        let mut heap = BinaryHeap::new();

        heap.push(entry(base + Duration::from_secs(60), 0));
        for seq in 1..=10 {
            let late = entry(base + Duration::from_secs(120), seq);
            late.cancelled.store(true, atomic::Ordering::Release);
            heap.push(late);
        }
        heap.push(entry(base + Duration::from_secs(90), 11));

        assert_eq!(purge_cancelled(&mut heap), 10);

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![0, 11]);
    }
}
