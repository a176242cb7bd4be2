//! Sequences

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use super::database::ModificationClock;

#[derive(Debug)]
pub struct Sequence {
    name: String,
    /// Last value handed out (`start - increment` before the first call)
    current: AtomicI64,
    increment: i64,
    last_modification_id: AtomicU64,
    clock: Arc<ModificationClock>,
}

impl Sequence {
    pub(crate) fn new(name: &str, start: i64, increment: i64, clock: Arc<ModificationClock>) -> Self {
        Self {
            name: name.to_string(),
            current: AtomicI64::new(start.wrapping_sub(increment)),
            increment,
            last_modification_id: AtomicU64::new(clock.current()),
            clock,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hand out the next value. Counts as a data modification.
    pub fn next_value(&self) -> i64 {
        let value = self
            .current
            .fetch_add(self.increment, Ordering::SeqCst)
            .wrapping_add(self.increment);
        self.record_modification(self.clock.advance());
        value
    }

    fn record_modification(&self, id: u64) {
        self.last_modification_id.fetch_max(id, Ordering::SeqCst);
    }

    pub fn modification_id(&self) -> u64 {
        self.last_modification_id.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_and_modification_ids() {
        let clock = Arc::new(ModificationClock::new());
        let seq = Sequence::new("SEQ", 10, 5, Arc::clone(&clock));

        assert_eq!(seq.next_value(), 10);
        let first = seq.modification_id();
        assert_eq!(seq.next_value(), 15);
        assert!(seq.modification_id() > first);
        assert_eq!(seq.modification_id(), clock.current());
    }

    #[test]
    fn test_modification_id_never_goes_back() {
        let clock = Arc::new(ModificationClock::new());
        let seq = Sequence::new("SEQ", 1, 1, clock);
        seq.record_modification(9);
        seq.record_modification(4);
        assert_eq!(seq.modification_id(), 9);
    }
}
