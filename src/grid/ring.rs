use std::iter::FromIterator;

/// A fixed-size ring with O(1) logical rotation.
///
/// Logical index `i` maps to the physical slot `(origin + i).rem_euclid(len)`,
/// so negative indices are legal and wrap around the ring. Rotating never
/// moves elements; it only shifts the origin.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Box<[T]>,
    origin: i64,
}

impl<T: Default> RingBuffer<T> {
    /// Allocates a ring of `len` default slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: Vec::from_iter((0..len).map(|_| T::default())).into_boxed_slice(),
            origin: 0,
        }
    }

    /// Resets every slot to its default value and the origin to zero,
    /// dropping any owned contents.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = T::default();
        }
        self.origin = 0;
    }
}

impl<T> RingBuffer<T> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Shifts the logical origin by `k`. After `rotate(k)`, logical index
    /// `i` yields what `i + k` yielded before the call.
    pub fn rotate(&mut self, k: i64) {
        self.origin += k;
    }

    pub fn get(&self, index: i64) -> &T {
        &self.slots[self.slot(index)]
    }

    pub fn get_mut(&mut self, index: i64) -> &mut T {
        let slot = self.slot(index);
        &mut self.slots[slot]
    }

    pub fn set(&mut self, index: i64, value: T) {
        let slot = self.slot(index);
        self.slots[slot] = value;
    }

    /// Iterates the ring in logical order, starting at index 0.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len() as i64).map(move |i| self.get(i))
    }

    fn slot(&self, index: i64) -> usize {
        debug_assert!(!self.slots.is_empty(), "indexed an empty ring");
        (self.origin + index).rem_euclid(self.slots.len() as i64) as usize
    }
}
