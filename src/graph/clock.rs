#![forbid(unsafe_code)]

use parking_lot::Mutex;

use crate::types::Timestamp;

/// Monotonic millisecond clock handing out one timestamp per batch.
///
/// Timestamps never repeat and never go backwards, even when the wall clock
/// does: each tick is `max(now, last + 1)`.
#[derive(Debug, Default)]
pub(crate) struct BatchClock {
    last: Mutex<u64>,
}

impl BatchClock {
    pub(crate) fn next(&self) -> Timestamp {
        let mut last = self.last.lock();
        let next = Timestamp::now().millis().max(last.saturating_add(1));
        *last = next;
        Timestamp(next)
    }

    /// Records a caller supplied timestamp so later ticks stay after it.
    pub(crate) fn observe(&self, timestamp: Timestamp) {
        let mut last = self.last.lock();
        if timestamp.millis() > *last && timestamp != Timestamp::MAX {
            *last = timestamp.millis();
        }
    }
}
