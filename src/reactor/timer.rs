use super::Reactor;

use std::cmp::Ordering;
use std::time::Instant;

/// Callback run once when a timer expires.
pub(crate) type TimerCallback = Box<dyn FnOnce(&mut Reactor) + Send>;

/// An entry in the reactor timer queue.
///
/// `TimerEntry` represents a scheduled callback at a specific
/// deadline. It is stored inside a binary heap ordered by deadline,
/// with ties broken by insertion order so that timers with the same
/// deadline fire first-in, first-out.
pub(crate) struct TimerEntry {
    /// The time at which the timer should fire.
    pub(crate) deadline: Instant,

    /// Insertion sequence number.
    pub(crate) sequence: u64,

    /// Work to run on the reactor thread.
    pub(crate) callback: TimerCallback,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.sequence == other.sequence
    }
}

impl Ord for TimerEntry {
    /// Orders timer entries by deadline, then by sequence.
    ///
    /// Note that the comparison is **reversed** so that a
    /// `BinaryHeap<TimerEntry>` behaves as a min-heap,
    /// where the earliest deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then(other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
