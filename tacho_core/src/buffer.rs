//! Capacity-bounded FIFO used for the interval buffer and the RPM history.
use std::collections::VecDeque;

/// Insertion-ordered buffer that evicts the oldest entry on overflow.
///
/// Storage is allocated once at construction so `push` never reallocates.
#[derive(Debug, Clone)]
pub struct BoundedBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> BoundedBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn push(&mut self, v: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(v);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Oldest-first iteration.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.buf.iter()
    }

    /// The most recent `n` entries (or all of them), oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.buf.len().saturating_sub(n);
        self.buf.iter().skip(skip)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.buf.iter().copied().collect()
    }
}

/// Pulse intervals in seconds, newest last.
pub type IntervalBuffer = BoundedBuffer<f64>;
/// Accepted RPM estimates, newest last.
pub type RpmHistory = BoundedBuffer<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_on_overflow() {
        let mut b = BoundedBuffer::new(3);
        for v in 1..=5 {
            b.push(v);
        }
        assert_eq!(b.len(), 3);
        assert_eq!(b.to_vec(), vec![3, 4, 5]);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut b = BoundedBuffer::new(10);
        for v in 0..6 {
            b.push(v);
        }
        let tail: Vec<_> = b.recent(3).copied().collect();
        assert_eq!(tail, vec![3, 4, 5]);
        let all: Vec<_> = b.recent(100).copied().collect();
        assert_eq!(all, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn zero_capacity_is_promoted_to_one() {
        let mut b = BoundedBuffer::new(0);
        b.push(1.0);
        b.push(2.0);
        assert_eq!(b.capacity(), 1);
        assert_eq!(b.to_vec(), vec![2.0]);
    }
}
