use std::collections::VecDeque;

use crate::types::Tick;

pub const DEFAULT_CAPACITY: usize = 200;

/// Count-bounded tick history for one instrument.
///
/// Ticks are kept in arrival order. Once `capacity` is reached, every push
/// evicts from the head so the buffer always holds the most recent ticks.
#[derive(Debug, Clone)]
pub struct TickBuffer {
    values: VecDeque<Tick>,
    capacity: usize,
}

impl Default for TickBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TickBuffer {
    /// A zero capacity is bumped to 1 so a buffer can always report its latest tick.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, tick: Tick) {
        self.values.push_back(tick);
        self.evict_overflow();
    }

    /// Drop from the head until length == capacity
    fn evict_overflow(&mut self) {
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Ordered copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Tick> {
        self.values.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&Tick> {
        self.values.back()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tick(n: u64) -> Tick {
        Tick::new("R_10", n as f64, n as i64, n)
    }

    #[test]
    fn empty_buffer_has_no_latest() {
        let buf = TickBuffer::new(5);
        assert!(buf.is_empty());
        assert!(buf.latest().is_none());
        assert!(buf.snapshot().is_empty());
    }

    #[test]
    fn push_below_capacity_keeps_everything() {
        let mut buf = TickBuffer::new(5);
        for n in 0..3 {
            buf.push(tick(n));
        }

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.latest().map(|t| t.epoch), Some(2));
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let mut buf = TickBuffer::new(3);
        for n in 0..5 {
            buf.push(tick(n));
        }

        let epochs: Vec<i64> = buf.snapshot().iter().map(|t| t.epoch).collect();
        assert_eq!(epochs, vec![2, 3, 4]);
    }

    #[test]
    fn snapshot_is_detached_from_later_pushes() {
        let mut buf = TickBuffer::new(3);
        buf.push(tick(1));
        let snap = buf.snapshot();
        buf.push(tick(2));

        assert_eq!(snap.len(), 1);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = TickBuffer::new(0);
        buf.push(tick(1));
        buf.push(tick(2));

        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.latest().map(|t| t.epoch), Some(2));
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity_and_keeps_tail(capacity in 1usize..64, extra in 0usize..200) {
            let mut buf = TickBuffer::new(capacity);
            let total = capacity + extra;
            for n in 0..total as u64 {
                buf.push(tick(n));
                prop_assert!(buf.len() <= capacity);
            }

            let expected: Vec<i64> = ((total - capacity) as i64..total as i64).collect();
            let got: Vec<i64> = buf.snapshot().iter().map(|t| t.epoch).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
