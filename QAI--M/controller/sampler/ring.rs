use std::collections::{vec_deque, VecDeque};

/// Fixed-capacity FIFO buffer. Pushing onto a full buffer evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct BoundedBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> BoundedBuffer<T> {
    /// Creates an empty buffer. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends an item, returning the evicted one when the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Maximum number of retained items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Most recently pushed item.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterates over the newest `n` items, oldest first. Yields fewer when short.
    pub fn tail(&self, n: usize) -> vec_deque::Iter<'_, T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.range(skip..)
    }

    /// Drops every retained item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> BoundedBuffer<T> {
    /// Copies the retained items, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<'a, T> IntoIterator for &'a BoundedBuffer<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_capacity_items_in_order() {
        for capacity in 1..6 {
            for extra in 0..4 {
                let mut buffer = BoundedBuffer::new(capacity);
                let total = capacity + extra;
                for value in 0..total {
                    buffer.push(value);
                }
                let expected: Vec<_> = (extra..total).collect();
                assert_eq!(buffer.to_vec(), expected, "capacity={capacity} extra={extra}");
            }
        }
    }

    #[test]
    fn push_reports_evictions() {
        let mut buffer = BoundedBuffer::new(2);
        assert_eq!(buffer.push('a'), None);
        assert_eq!(buffer.push('b'), None);
        assert_eq!(buffer.push('c'), Some('a'));
        assert_eq!(buffer.last(), Some(&'c'));
    }

    #[test]
    fn tail_is_clamped() {
        let mut buffer = BoundedBuffer::new(4);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        assert_eq!(buffer.tail(2).copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(buffer.tail(10).count(), 3);
        assert_eq!(buffer.tail(0).count(), 0);
    }

    #[test]
    fn zero_capacity_is_raised() {
        let mut buffer = BoundedBuffer::new(0);
        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.to_vec(), vec![2]);
    }
}
