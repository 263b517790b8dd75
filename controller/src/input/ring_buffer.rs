/// Fixed-capacity history, newest first.
///
/// Notes
/// - `get(0)` is the most recently pushed element, `get(len - 1)` the oldest retained one.
/// - Once full, every `push_front` overwrites the oldest slot; nothing is reallocated.
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    /// Physical slot the next push writes to.
    next: usize,
}

impl<T> RingBuffer<T> {
    /// Empty buffer. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    /// Full buffer where every slot holds a clone of `value`.
    pub fn filled(capacity: usize, value: T) -> Self
    where
        T: Clone,
    {
        let mut buffer = Self::new(capacity);
        for _ in 0..buffer.capacity {
            buffer.push_front(value.clone());
        }
        buffer
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Push a new newest element, evicting the oldest when full.
    pub fn push_front(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.next] = value;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    #[inline]
    fn physical(&self, age: usize) -> Option<usize> {
        if age >= self.data.len() {
            return None;
        }
        Some((self.next + self.capacity - 1 - age) % self.capacity)
    }

    /// Element pushed `age` pushes ago.
    #[inline]
    pub fn get(&self, age: usize) -> Option<&T> {
        self.physical(age).map(|i| &self.data[i])
    }

    #[inline]
    pub fn get_mut(&mut self, age: usize) -> Option<&mut T> {
        self.physical(age).map(|i| &mut self.data[i])
    }

    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|age| self.get(age))
    }

    /// Newest to oldest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |age| self.get(age))
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_is_at_index_zero() {
        let mut buffer = RingBuffer::new(4);
        for i in 0..4 {
            buffer.push_front(i);
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.get(0), Some(&3));
        assert_eq!(buffer.get(3), Some(&0));
        assert_eq!(buffer.get(4), None);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn push_when_full_evicts_exactly_the_oldest() {
        let mut buffer = RingBuffer::new(3);
        for i in 0..3 {
            buffer.push_front(i);
        }
        buffer.push_front(10);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.front(), Some(&10));
        assert_eq!(buffer.back(), Some(&1));
        assert_eq!(buffer.iter().rev().copied().collect::<Vec<_>>(), vec![1, 2, 10]);
    }

    #[test]
    fn partially_filled_buffer_indexes_by_age() {
        let mut buffer = RingBuffer::new(5);
        buffer.push_front('a');
        buffer.push_front('b');
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get(0), Some(&'b'));
        assert_eq!(buffer.get(1), Some(&'a'));
        assert_eq!(buffer.get(2), None);
    }

    #[test]
    fn filled_buffer_starts_full_and_mutates_in_place() {
        let mut buffer = RingBuffer::filled(3, 0u8);
        assert!(buffer.is_full());
        if let Some(slot) = buffer.get_mut(2) {
            *slot = 9;
        }
        assert_eq!(buffer.back(), Some(&9));
        buffer.push_front(1);
        assert_eq!(buffer.back(), Some(&0));
    }
}
