// Fixed-capacity FIFO ring buffer.

/// Bounded sample window; pushing into a full window evicts the oldest sample.
#[derive(Clone, Debug, PartialEq)]
pub struct RingWindow<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the oldest element once the buffer is full.
    head: usize,
}

impl<T: Clone> RingWindow<T> {
    /// # Panics
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingWindow requires capacity > 0");
        Self { buf: Vec::with_capacity(capacity), capacity, head: 0 }
    }

    pub fn capacity(&self) -> usize { self.capacity }
    pub fn len(&self) -> usize { self.buf.len() }
    pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    pub fn is_full(&self) -> bool { self.buf.len() == self.capacity }

    /// Append `value`, returning the evicted element if the window was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.buf.len() < self.capacity {
            self.buf.push(value);
            None
        } else {
            let old = std::mem::replace(&mut self.buf[self.head], value);
            self.head = (self.head + 1) % self.capacity;
            Some(old)
        }
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.buf.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn to_vec(&self) -> Vec<T> { self.iter().cloned().collect() }

    pub fn latest(&self) -> Option<&T> {
        if self.buf.is_empty() {
            None
        } else if self.head == 0 {
            self.buf.last()
        } else {
            self.buf.get(self.head - 1)
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut w = RingWindow::new(3);
        assert_eq!(w.push(1), None);
        w.push(2);
        w.push(3);
        assert!(w.is_full());
        assert_eq!(w.push(4), Some(1));
        assert_eq!(w.push(5), Some(2));
        assert_eq!(w.to_vec(), vec![3, 4, 5]);
        assert_eq!(w.latest(), Some(&5));
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn clear_restarts() {
        let mut w = RingWindow::new(2);
        w.push(1.0);
        w.push(2.0);
        w.push(3.0);
        w.clear();
        assert!(w.is_empty());
        assert_eq!(w.latest(), None);
        w.push(9.0);
        assert_eq!(w.to_vec(), vec![9.0]);
    }
}
